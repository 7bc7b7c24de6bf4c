pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    clock::{FixedClock, SystemClock},
    local_storage::LocalStorage,
    memory_store::InMemoryStore,
    snapshot_store::SnapshotStore,
};
pub use config::garage_config::GarageConfig;
pub use core::{
    lifecycle::{EventOutcome, SessionLifecycleManager},
    replay::{ReplayEngine, ReplayReport},
    revenue::RevenueAggregator,
};
pub use domain::events::{EventType, ParkingEvent, WebhookEvent};
pub use utils::error::{ErrorKind, ParkingError, Result};
