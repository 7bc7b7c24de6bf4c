use crate::domain::model::{ParkingSession, Sector, Spot};
use crate::domain::ports::{NewSession, ParkingStore};
use crate::utils::error::{ParkingError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 整座車庫的狀態，也是快照檔的格式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GarageState {
    pub sectors: Vec<Sector>,
    pub spots: Vec<Spot>,
    pub sessions: Vec<ParkingSession>,
    pub next_session_id: u64,
}

impl GarageState {
    pub fn new(sectors: Vec<Sector>, spots: Vec<Spot>) -> Self {
        Self {
            sectors,
            spots,
            sessions: Vec::new(),
            next_session_id: 1,
        }
    }

    fn session_index(&self, id: u64) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ParkingError::not_found(format!("session {} does not exist", id)))
    }

    fn spot_index(&self, code: &str) -> Result<usize> {
        self.spots
            .iter()
            .position(|s| s.code == code)
            .ok_or_else(|| ParkingError::not_found(format!("spot {} does not exist", code)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<GarageState>,
}

impl InMemoryStore {
    pub fn new(sectors: Vec<Sector>, spots: Vec<Spot>) -> Self {
        Self::from_state(GarageState::new(sectors, spots))
    }

    pub fn from_state(state: GarageState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn snapshot(&self) -> GarageState {
        self.state.read().await.clone()
    }

    pub async fn restore(&self, state: GarageState) {
        *self.state.write().await = state;
    }
}

#[async_trait]
impl ParkingStore for InMemoryStore {
    async fn sectors(&self) -> Result<Vec<Sector>> {
        Ok(self.state.read().await.sectors.clone())
    }

    async fn find_sector(&self, code: &str) -> Result<Option<Sector>> {
        let state = self.state.read().await;
        Ok(state.sectors.iter().find(|s| s.code == code).cloned())
    }

    async fn count_occupied(&self, sector: &str) -> Result<u32> {
        let state = self.state.read().await;
        let count = state
            .spots
            .iter()
            .filter(|spot| spot.sector == sector && spot.occupied)
            .count();
        u32::try_from(count).map_err(|_| ParkingError::storage("occupied count overflow"))
    }

    async fn spots(&self) -> Result<Vec<Spot>> {
        Ok(self.state.read().await.spots.clone())
    }

    async fn free_spots(&self, sector: &str) -> Result<Vec<Spot>> {
        let state = self.state.read().await;
        Ok(state
            .spots
            .iter()
            .filter(|spot| spot.sector == sector && !spot.occupied)
            .cloned()
            .collect())
    }

    async fn find_open_session(&self, plate: &str) -> Result<Option<ParkingSession>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.license_plate == plate && s.is_open())
            .cloned())
    }

    async fn insert_session(&self, session: NewSession) -> Result<ParkingSession> {
        let mut state = self.state.write().await;
        if state
            .sessions
            .iter()
            .any(|s| s.license_plate == session.license_plate && s.is_open())
        {
            return Err(ParkingError::conflict(format!(
                "vehicle {} already has an open session",
                session.license_plate
            )));
        }

        let id = state.next_session_id.max(1);
        state.next_session_id = id + 1;

        let created = ParkingSession {
            id,
            license_plate: session.license_plate,
            sector: session.sector,
            spot: None,
            entry_time: session.entry_time,
            parked_time: None,
            exit_time: None,
            applied_price: session.applied_price,
            final_amount: None,
        };
        state.sessions.push(created.clone());
        Ok(created)
    }

    async fn park(
        &self,
        session_id: u64,
        spot_code: &str,
        at: NaiveDateTime,
    ) -> Result<(ParkingSession, Spot)> {
        let mut state = self.state.write().await;
        let session_idx = state.session_index(session_id)?;
        let spot_idx = state.spot_index(spot_code)?;

        let session = &state.sessions[session_idx];
        let spot = &state.spots[spot_idx];
        if !session.is_open() {
            return Err(ParkingError::conflict(format!(
                "session {} is already closed",
                session_id
            )));
        }
        if let Some(current) = &session.spot {
            return Err(ParkingError::conflict(format!(
                "vehicle {} is already parked at spot {}",
                session.license_plate, current
            )));
        }
        if spot.sector != session.sector {
            return Err(ParkingError::conflict(format!(
                "spot {} belongs to sector {}, not {}",
                spot_code, spot.sector, session.sector
            )));
        }
        if spot.occupied {
            return Err(ParkingError::conflict(format!(
                "spot {} is already occupied by {}",
                spot_code,
                spot.occupied_by.as_deref().unwrap_or("unknown")
            )));
        }

        let plate = session.license_plate.clone();
        let spot = &mut state.spots[spot_idx];
        spot.occupy(&plate, at);
        let spot = spot.clone();

        let session = &mut state.sessions[session_idx];
        session.spot = Some(spot.code.clone());
        session.parked_time = Some(at);
        Ok((session.clone(), spot))
    }

    async fn close(
        &self,
        session_id: u64,
        exit_time: NaiveDateTime,
        final_amount: Decimal,
    ) -> Result<(ParkingSession, Option<Spot>)> {
        let mut state = self.state.write().await;
        let session_idx = state.session_index(session_id)?;

        let session = &state.sessions[session_idx];
        if !session.is_open() {
            return Err(ParkingError::conflict(format!(
                "session {} is already closed",
                session_id
            )));
        }
        let plate = session.license_plate.clone();
        let spot_idx = match &session.spot {
            Some(code) => Some(state.spot_index(code)?),
            None => None,
        };

        let released = spot_idx.map(|idx| {
            let spot = &mut state.spots[idx];
            if spot.occupied_by.as_deref() == Some(plate.as_str()) {
                spot.release();
            }
            spot.clone()
        });

        let session = &mut state.sessions[session_idx];
        session.exit_time = Some(exit_time);
        session.final_amount = Some(final_amount);
        Ok((session.clone(), released))
    }

    async fn sessions(&self) -> Result<Vec<ParkingSession>> {
        Ok(self.state.read().await.sessions.clone())
    }

    async fn sessions_exited_on(
        &self,
        sector: &str,
        date: NaiveDate,
    ) -> Result<Vec<ParkingSession>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| {
                s.sector == sector
                    && s.final_amount.is_some()
                    && s.exit_time.map(|t| t.date()) == Some(date)
            })
            .cloned()
            .collect())
    }
}
