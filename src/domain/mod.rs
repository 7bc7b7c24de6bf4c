// Domain layer: core models, inbound events and ports (interfaces).

pub mod events;
pub mod model;
pub mod ports;
