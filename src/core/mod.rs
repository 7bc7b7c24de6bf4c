pub mod allocation;
pub mod billing;
pub mod export;
pub mod garage;
pub mod lifecycle;
pub mod pricing;
pub mod replay;
pub mod revenue;

pub use crate::domain::model::{ParkingSession, Sector, SessionState, Spot};
pub use crate::domain::ports::{Clock, ParkingStore, Storage};
pub use crate::utils::error::Result;
