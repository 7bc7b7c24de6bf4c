use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub code: String,
    pub base_price: Decimal,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub code: String,
    pub sector: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub occupied: bool,
    #[serde(default)]
    pub occupied_by: Option<String>,
    #[serde(default)]
    pub occupied_at: Option<NaiveDateTime>,
}

impl Spot {
    pub fn new(code: impl Into<String>, sector: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            code: code.into(),
            sector: sector.into(),
            lat,
            lng,
            occupied: false,
            occupied_by: None,
            occupied_at: None,
        }
    }

    pub fn occupy(&mut self, plate: &str, at: NaiveDateTime) {
        self.occupied = true;
        self.occupied_by = Some(plate.to_string());
        self.occupied_at = Some(at);
    }

    pub fn release(&mut self) {
        self.occupied = false;
        self.occupied_by = None;
        self.occupied_at = None;
    }
}

/// 單一車輛從 ENTRY 到 EXIT 的停車紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub id: u64,
    pub license_plate: String,
    pub sector: String,
    pub spot: Option<String>,
    pub entry_time: NaiveDateTime,
    pub parked_time: Option<NaiveDateTime>,
    pub exit_time: Option<NaiveDateTime>,
    /// ENTRY 當下的每小時費率快照，之後不再重新計算
    pub applied_price: Decimal,
    pub final_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    OpenUnparked,
    OpenParked,
    Closed,
}

impl ParkingSession {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    pub fn state(&self) -> SessionState {
        match (self.exit_time, self.spot.as_ref()) {
            (Some(_), _) => SessionState::Closed,
            (None, Some(_)) => SessionState::OpenParked,
            (None, None) => SessionState::OpenUnparked,
        }
    }
}
