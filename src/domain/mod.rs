// Domain layer: tree records, derived statistics and the ports the engine reads through.

pub mod model;
pub mod ports;
pub mod stats;
