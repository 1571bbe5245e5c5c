// src/health/mod.rs

//! Heartbeat-based liveness detection for in-flight nodes.

pub mod monitor;

pub use monitor::{
    default_thresholds, thresholds_from_section, HealthMonitor, HealthReport, HealthStatus,
    HeartbeatThresholds, NodeHealth,
};
