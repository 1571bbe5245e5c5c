// src/state/snapshot.rs

//! The persisted state snapshot document and its patch type.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{GraphId, NodeId, NodeStatus, SessionId};

/// Overall status of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Last reported liveness signal for one in-flight node.
///
/// One record per monitored node, overwritten on every heartbeat and
/// dropped on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub node_id: NodeId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub progress: Map<String, Value>,
    #[serde(default = "default_heartbeat_status")]
    pub status: NodeStatus,
}

fn default_heartbeat_status() -> NodeStatus {
    NodeStatus::Running
}

/// The single current-state snapshot for a session.
///
/// Every mutation is a full-document atomic rewrite; `Default` is the
/// well-defined idle state substituted when the document is absent or
/// corrupt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub current_graph_id: Option<GraphId>,

    #[serde(default)]
    pub current_phase: u32,

    #[serde(default)]
    pub active_nodes: Vec<NodeId>,

    #[serde(default)]
    pub completed_nodes: Vec<NodeId>,

    #[serde(default)]
    pub failed_nodes: Vec<NodeId>,

    #[serde(default)]
    pub status: RunStatus,

    #[serde(default)]
    pub session_id: Option<SessionId>,

    /// Retry counts per node id.
    #[serde(default)]
    pub retry_counts: BTreeMap<NodeId, u32>,

    /// Heartbeat records keyed by node id (health monitor storage).
    #[serde(default)]
    pub heartbeats: BTreeMap<NodeId, HeartbeatRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update merged into the snapshot by [`StateStore::write`].
///
/// Only the fields present (`Some`) are applied; everything else keeps
/// its current value.
///
/// [`StateStore::write`]: crate::state::StateStore::write
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub current_graph_id: Option<GraphId>,
    pub current_phase: Option<u32>,
    pub active_nodes: Option<Vec<NodeId>>,
    pub completed_nodes: Option<Vec<NodeId>>,
    pub failed_nodes: Option<Vec<NodeId>>,
    pub status: Option<RunStatus>,
    pub session_id: Option<SessionId>,
    pub retry_counts: Option<BTreeMap<NodeId, u32>>,
    pub heartbeats: Option<BTreeMap<NodeId, HeartbeatRecord>>,
    pub abort_reason: Option<String>,
}

impl StatePatch {
    /// Merge this patch into a snapshot, field by field.
    pub fn apply(self, snapshot: &mut StateSnapshot) {
        if let Some(v) = self.current_graph_id {
            snapshot.current_graph_id = Some(v);
        }
        if let Some(v) = self.current_phase {
            snapshot.current_phase = v;
        }
        if let Some(v) = self.active_nodes {
            snapshot.active_nodes = v;
        }
        if let Some(v) = self.completed_nodes {
            snapshot.completed_nodes = v;
        }
        if let Some(v) = self.failed_nodes {
            snapshot.failed_nodes = v;
        }
        if let Some(v) = self.status {
            snapshot.status = v;
        }
        if let Some(v) = self.session_id {
            snapshot.session_id = Some(v);
        }
        if let Some(v) = self.retry_counts {
            snapshot.retry_counts = v;
        }
        if let Some(v) = self.heartbeats {
            snapshot.heartbeats = v;
        }
        if let Some(v) = self.abort_reason {
            snapshot.abort_reason = Some(v);
        }
    }
}

/// What `prepare_for_resume` recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePlan {
    pub graph_id: GraphId,
    /// Nodes that were active when execution was interrupted. They must be
    /// reset to pending and re-admitted, not assumed still running.
    pub resumed_nodes: Vec<NodeId>,
}
