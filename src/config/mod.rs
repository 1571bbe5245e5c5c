// src/config/mod.rs

//! Orchestrator settings: tier concurrency ceilings and heartbeat
//! thresholds, loaded from a TOML file with working defaults throughout.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{HeartbeatSection, LimitsSection, RawSettings, Settings, ThresholdSection};
