// src/lib.rs

//! Scheduling and runtime-state core for an orchestrator of decomposed
//! multi-step tasks executed by a pool of heterogeneous workers.
//!
//! The crate continuously answers three questions:
//! - which unit of work may start next (graph readiness + admission
//!   control under tier ceilings and territory claims)
//! - who may mutate shared resources concurrently (advisory territories)
//! - whether a stalled or crashed worker must be detected and recovered
//!   (heartbeat-based health monitoring, crash-safe persisted state with
//!   resume semantics)
//!
//! The work itself is performed by an external, out-of-process executor;
//! this core only exposes "what is ready now" and records the start /
//! heartbeat / terminate transitions the executor reports back. Every
//! public operation is synchronous; the async [`engine::Runtime`] shell
//! is just channel plumbing around the pure [`engine::CoreRuntime`].

pub mod admission;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod health;
pub mod logging;
pub mod session;
pub mod state;
pub mod template;
pub mod types;

pub use admission::{Admission, AdmissionController, TerritoryClaim, TierLimits};
pub use engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
pub use errors::{OrchdagError, Result};
pub use events::{EventLog, EventSource, EventType};
pub use graph::{Scheduler, TaskGraph};
pub use health::HealthMonitor;
pub use session::SessionPaths;
pub use state::{StateSnapshot, StateStore};
pub use template::TrackTemplate;
pub use types::{CostTier, EdgeCondition, GraphStatus, NodeStatus, Role, Track};
