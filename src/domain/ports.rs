use crate::domain::model::{ParkingSession, Sector, Spot};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// ENTRY 建立 session 時所需的欄位，id 由 store 指派
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub license_plate: String,
    pub sector: String,
    pub entry_time: NaiveDateTime,
    pub applied_price: Decimal,
}

/// sectors / spots / sessions 的存取介面。
///
/// 實作必須保證：
/// - `sectors` 與 `free_spots` 依設定檔順序回傳
/// - `insert_session` 在同一車牌已有未結束 session 時回傳 `Conflict`
/// - `park` 與 `close` 各自是一次完整的寫入：session 與車位一起變更，
///   失敗時兩者都維持原狀
/// - 儲存層失敗一律以 `ParkingError::Storage` 回報
#[async_trait]
pub trait ParkingStore: Send + Sync {
    async fn sectors(&self) -> Result<Vec<Sector>>;
    async fn find_sector(&self, code: &str) -> Result<Option<Sector>>;
    async fn count_occupied(&self, sector: &str) -> Result<u32>;

    async fn spots(&self) -> Result<Vec<Spot>>;
    async fn free_spots(&self, sector: &str) -> Result<Vec<Spot>>;

    async fn find_open_session(&self, plate: &str) -> Result<Option<ParkingSession>>;
    async fn insert_session(&self, session: NewSession) -> Result<ParkingSession>;

    /// 把車位指派給未停車的 session，並以該車牌占用車位。
    ///
    /// session 已結束或已有車位、車位已被占用、車位不屬於 session 的 sector
    /// 時回傳 `Conflict`。
    async fn park(
        &self,
        session_id: u64,
        spot_code: &str,
        at: NaiveDateTime,
    ) -> Result<(ParkingSession, Spot)>;

    /// 結束 session 並釋放其車位 (若有)。已結束的 session 回傳 `Conflict`。
    async fn close(
        &self,
        session_id: u64,
        exit_time: NaiveDateTime,
        final_amount: Decimal,
    ) -> Result<(ParkingSession, Option<Spot>)>;

    async fn sessions(&self) -> Result<Vec<ParkingSession>>;
    async fn sessions_exited_on(&self, sector: &str, date: NaiveDate)
        -> Result<Vec<ParkingSession>>;
}
