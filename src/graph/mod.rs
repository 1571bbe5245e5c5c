// src/graph/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`model`] holds the persisted task graph document: nodes, edges and
//!   the execution sub-object mirroring active/completed/failed ids.
//! - [`scheduler`] owns the per-node state machine: template
//!   instantiation, readiness computation, status transitions and
//!   cycle-free ordering.
//! - [`store`] persists a graph document with the crash-safe replace
//!   pattern; an unreadable graph is a hard fault since no safe default
//!   exists.

pub mod model;
pub mod scheduler;
pub mod store;

pub use model::{Edge, ExecutionState, Node, NodeConstraints, TaskGraph};
pub use scheduler::{ExecutionSummary, Scheduler, StatusCounts};
pub use store::{load_graph, save_graph};
