use crate::core::allocation::choose_spot;
use crate::core::billing::final_amount;
use crate::core::pricing::applied_price;
use crate::domain::events::{ParkingEvent, WebhookEvent};
use crate::domain::model::{ParkingSession, Spot};
use crate::domain::ports::{Clock, NewSession, ParkingStore};
use crate::utils::error::{ParkingError, Result};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 成功處理一個事件後的結果
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Entered {
        session: ParkingSession,
    },
    Parked {
        session: ParkingSession,
        spot: Spot,
    },
    Exited {
        session: ParkingSession,
        released_spot: Option<Spot>,
    },
}

impl EventOutcome {
    pub fn session(&self) -> &ParkingSession {
        match self {
            Self::Entered { session }
            | Self::Parked { session, .. }
            | Self::Exited { session, .. } => session,
        }
    }
}

/// 以車牌為單位的非同步鎖。沒有人持有時會從表中移除。
#[derive(Debug, Default)]
struct PlateLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

struct PlateGuard<'a> {
    locks: &'a PlateLocks,
    plate: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PlateLocks {
    async fn acquire(&self, plate: &str) -> PlateGuard<'_> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(plate.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        PlateGuard {
            locks: self,
            plate: plate.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for PlateGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        if map
            .get(&self.plate)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.plate);
        }
    }
}

/// sessions 與 spots 唯一的寫入者。
///
/// 同一車牌的事件依序處理；「列出空位 → 停車」另外由配置鎖保護，
/// 因此兩台車不會在 PARKED 時拿到同一個車位。每個事件只對 store 做一次寫入。
/// ENTRY 的容量檢查與 PARKED 的配置是兩個獨立步驟，ENTRY 成功後仍可能在
/// PARKED 時因無空位被拒絕。
pub struct SessionLifecycleManager<S: ParkingStore, C: Clock> {
    store: Arc<S>,
    clock: C,
    plate_locks: PlateLocks,
    allocation_lock: AsyncMutex<()>,
}

impl<S: ParkingStore, C: Clock> SessionLifecycleManager<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self {
            store,
            clock,
            plate_locks: PlateLocks::default(),
            allocation_lock: AsyncMutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 驗證原始 webhook 後依事件類型分派
    pub async fn handle_webhook(&self, raw: WebhookEvent) -> Result<EventOutcome> {
        let event = ParkingEvent::try_from(raw)?;
        self.handle(event).await
    }

    pub async fn handle(&self, event: ParkingEvent) -> Result<EventOutcome> {
        let event_type = event.event_type();
        let plate = event.license_plate().to_string();

        let result = match event {
            ParkingEvent::Entry {
                license_plate,
                entry_time,
            } => self
                .entry(&license_plate, entry_time)
                .await
                .map(|session| EventOutcome::Entered { session }),
            ParkingEvent::Parked {
                license_plate,
                lat,
                lng,
            } => self
                .parked(&license_plate, lat, lng)
                .await
                .map(|(session, spot)| EventOutcome::Parked { session, spot }),
            ParkingEvent::Exit {
                license_plate,
                exit_time,
            } => self
                .exit(&license_plate, exit_time)
                .await
                .map(|(session, released_spot)| EventOutcome::Exited {
                    session,
                    released_spot,
                }),
        };

        if let Err(e) = &result {
            if e.is_business_rejection() {
                tracing::warn!(plate = %plate, event = %event_type, kind = ?e.kind(), "⚠️ Event rejected: {}", e);
            } else {
                tracing::error!(plate = %plate, event = %event_type, "❌ Event failed: {}", e);
            }
        }
        result
    }

    pub async fn entry(&self, plate: &str, entry_time: NaiveDateTime) -> Result<ParkingSession> {
        let _plate_guard = self.plate_locks.acquire(plate).await;
        tracing::debug!(plate, "🚗 Processing ENTRY");

        if self.store.find_open_session(plate).await?.is_some() {
            return Err(ParkingError::conflict(format!(
                "vehicle {} already has an open session",
                plate
            )));
        }

        let mut selected = None;
        for sector in self.store.sectors().await? {
            let occupied = self.store.count_occupied(&sector.code).await?;
            if occupied < sector.max_capacity {
                selected = Some((sector, occupied));
                break;
            }
        }
        let (sector, occupied) =
            selected.ok_or_else(|| ParkingError::capacity("garage is full"))?;

        let price = applied_price(sector.base_price, occupied, sector.max_capacity);
        tracing::debug!(
            sector = %sector.code,
            occupied,
            capacity = sector.max_capacity,
            base_price = %sector.base_price,
            applied_price = %price,
            "💰 Applied price computed"
        );

        let session = self
            .store
            .insert_session(NewSession {
                license_plate: plate.to_string(),
                sector: sector.code.clone(),
                entry_time,
                applied_price: price,
            })
            .await?;

        tracing::info!(
            plate,
            session_id = session.id,
            sector = %session.sector,
            applied_price = %session.applied_price,
            "✅ Entry session created"
        );
        Ok(session)
    }

    pub async fn parked(
        &self,
        plate: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<(ParkingSession, Spot)> {
        let _plate_guard = self.plate_locks.acquire(plate).await;
        tracing::debug!(plate, ?lat, ?lng, "🅿️ Processing PARKED");

        let session = self.open_session(plate).await?;
        if let Some(spot) = &session.spot {
            return Err(ParkingError::conflict(format!(
                "vehicle {} is already parked at spot {}",
                plate, spot
            )));
        }

        let _allocation_guard = self.allocation_lock.lock().await;

        let free_spots = self.store.free_spots(&session.sector).await?;
        let chosen = choose_spot(&free_spots, lat, lng).ok_or_else(|| {
            ParkingError::capacity(format!("no free spots in sector {}", session.sector))
        })?;

        let (session, spot) = self
            .store
            .park(session.id, &chosen.code, self.clock.now())
            .await?;

        tracing::info!(
            plate,
            session_id = session.id,
            spot = %spot.code,
            lat = spot.lat,
            lng = spot.lng,
            "🎯 Vehicle parked"
        );
        Ok((session, spot))
    }

    pub async fn exit(
        &self,
        plate: &str,
        exit_time: NaiveDateTime,
    ) -> Result<(ParkingSession, Option<Spot>)> {
        let _plate_guard = self.plate_locks.acquire(plate).await;
        tracing::debug!(plate, "🚪 Processing EXIT");

        let session = self.open_session(plate).await?;
        let amount = final_amount(session.entry_time, exit_time, session.applied_price)?;

        let (session, released) = self.store.close(session.id, exit_time, amount).await?;

        tracing::info!(
            plate,
            session_id = session.id,
            final_amount = %amount,
            released_spot = released.as_ref().map(|s| s.code.as_str()),
            "💵 Exit processed"
        );
        Ok((session, released))
    }

    async fn open_session(&self, plate: &str) -> Result<ParkingSession> {
        self.store.find_open_session(plate).await?.ok_or_else(|| {
            ParkingError::not_found(format!("no open session for vehicle {}", plate))
        })
    }
}
