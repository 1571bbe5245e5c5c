// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the task graph scheduler
//! - admission control (tier ceilings + territories)
//! - the persisted state snapshot and event log
//! - the runtime event loop that reacts to worker heartbeats,
//!   terminations and shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. No operation in the core blocks on the
//! work itself: "running" represents delegated work happening in an
//! external executor, and the core only records reported transitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{CostTier, GraphId, NodeId, Role};

/// Outcome of a unit of work, as reported by the external executor.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    Completed { outputs: Map<String, Value> },
    Failed { error: Value },
}

/// Events flowing into the runtime from the external executor and the
/// embedding process.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Re-evaluate readiness and dispatch whatever admission allows.
    GraphTriggered,
    /// A worker reported liveness/progress for an in-flight node.
    NodeHeartbeat {
        node: NodeId,
        progress: Option<Map<String, Value>>,
    },
    /// A worker finished a node, successfully or not.
    NodeTerminated {
        node: NodeId,
        outcome: NodeOutcome,
    },
    /// Graceful shutdown requested.
    ShutdownRequested,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is running and nothing more
    /// can be dispatched (the graph is complete, or blocked on failures
    /// only an explicit retry can clear).
    pub exit_when_idle: bool,
}

/// A node handed to the executor: everything it needs to start the work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchedNode {
    pub node_id: NodeId,
    pub graph_id: GraphId,
    pub role: Role,
    pub title: String,
    pub tier: CostTier,
    pub background: bool,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
