use crate::adapters::memory_store::{GarageState, InMemoryStore};
use crate::domain::model::{ParkingSession, Sector, Spot};
use crate::domain::ports::{NewSession, ParkingStore, Storage};
use crate::utils::error::{ParkingError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

pub const DEFAULT_SNAPSHOT_FILE: &str = "garage_state.json";

/// 只讀取快照，不寫回。檔案不存在時回傳 `None`
pub async fn load_snapshot<St: Storage>(storage: &St, path: &str) -> Result<Option<GarageState>> {
    if !storage.exists(path).await {
        return Ok(None);
    }
    let data = storage
        .read_file(path)
        .await
        .map_err(|e| ParkingError::storage(format!("cannot read {}: {}", path, e)))?;
    let state: GarageState = serde_json::from_slice(&data)
        .map_err(|e| ParkingError::storage(format!("snapshot {} is corrupt: {}", path, e)))?;
    tracing::info!(
        "📂 Loaded garage state from {} ({} sessions)",
        path,
        state.sessions.len()
    );
    Ok(Some(state))
}

/// 每次成功寫入後把整座車庫狀態存成 JSON 快照。
///
/// 快照寫入失敗時還原記憶體狀態並回傳 `Storage` 錯誤。
pub struct SnapshotStore<St: Storage> {
    inner: InMemoryStore,
    storage: St,
    path: String,
    write_lock: Mutex<()>,
}

impl<St: Storage> SnapshotStore<St> {
    /// 有快照就沿用，否則以設定檔的 sectors / spots 建立新狀態
    pub async fn open(
        storage: St,
        path: impl Into<String>,
        sectors: Vec<Sector>,
        spots: Vec<Spot>,
    ) -> Result<Self> {
        let path = path.into();

        let state = match load_snapshot(&storage, &path).await? {
            Some(state) => state,
            None => {
                tracing::info!("🆕 No snapshot at {}, starting from layout", path);
                GarageState::new(sectors, spots)
            }
        };

        let store = Self {
            inner: InMemoryStore::from_state(state),
            storage,
            path,
            write_lock: Mutex::new(()),
        };
        store.persist().await?;
        Ok(store)
    }

    pub async fn snapshot(&self) -> GarageState {
        self.inner.snapshot().await
    }

    pub fn storage(&self) -> &St {
        &self.storage
    }

    async fn persist(&self) -> Result<()> {
        let state = self.inner.snapshot().await;
        let data = serde_json::to_vec_pretty(&state)?;
        self.storage
            .write_file(&self.path, &data)
            .await
            .map_err(|e| ParkingError::storage(format!("cannot write {}: {}", self.path, e)))?;
        tracing::debug!("💾 Snapshot written ({} bytes)", data.len());
        Ok(())
    }

    async fn commit<T>(&self, before: GarageState, value: T) -> Result<T> {
        if let Err(e) = self.persist().await {
            self.inner.restore(before).await;
            return Err(e);
        }
        Ok(value)
    }
}

#[async_trait]
impl<St: Storage> ParkingStore for SnapshotStore<St> {
    async fn sectors(&self) -> Result<Vec<Sector>> {
        self.inner.sectors().await
    }

    async fn find_sector(&self, code: &str) -> Result<Option<Sector>> {
        self.inner.find_sector(code).await
    }

    async fn count_occupied(&self, sector: &str) -> Result<u32> {
        self.inner.count_occupied(sector).await
    }

    async fn spots(&self) -> Result<Vec<Spot>> {
        self.inner.spots().await
    }

    async fn free_spots(&self, sector: &str) -> Result<Vec<Spot>> {
        self.inner.free_spots(sector).await
    }

    async fn find_open_session(&self, plate: &str) -> Result<Option<ParkingSession>> {
        self.inner.find_open_session(plate).await
    }

    async fn insert_session(&self, session: NewSession) -> Result<ParkingSession> {
        let _write = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let created = self.inner.insert_session(session).await?;
        self.commit(before, created).await
    }

    async fn park(
        &self,
        session_id: u64,
        spot_code: &str,
        at: NaiveDateTime,
    ) -> Result<(ParkingSession, Spot)> {
        let _write = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let parked = self.inner.park(session_id, spot_code, at).await?;
        self.commit(before, parked).await
    }

    async fn close(
        &self,
        session_id: u64,
        exit_time: NaiveDateTime,
        final_amount: Decimal,
    ) -> Result<(ParkingSession, Option<Spot>)> {
        let _write = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let closed = self.inner.close(session_id, exit_time, final_amount).await?;
        self.commit(before, closed).await
    }

    async fn sessions(&self) -> Result<Vec<ParkingSession>> {
        self.inner.sessions().await
    }

    async fn sessions_exited_on(
        &self,
        sector: &str,
        date: NaiveDate,
    ) -> Result<Vec<ParkingSession>> {
        self.inner.sessions_exited_on(sector, date).await
    }
}
