//! Database query modules, one per table family

pub mod content;
pub mod engagement;
pub mod profiles;
pub mod sessions;
pub mod stats;
pub mod telemetry;
