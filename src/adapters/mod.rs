// Adapters layer: concrete implementations of the domain ports (stores, storage, clock).

pub mod clock;
pub mod local_storage;
pub mod memory_store;
pub mod snapshot_store;
