// src/graph/model.rs

//! The persisted task graph document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::admission::TerritoryClaim;
use crate::types::{CostTier, EdgeCondition, GraphId, GraphStatus, NodeId, NodeStatus, Role, Track};

/// One unit of work in a task graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    pub title: String,

    #[serde(default = "default_node_status")]
    pub status: NodeStatus,

    #[serde(default)]
    pub constraints: NodeConstraints,

    /// Exclusive resource claims this node declares for its runtime.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub territories: Vec<TerritoryClaim>,

    /// Opaque outputs reported by the worker on completion. This layer
    /// never interprets them.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub outputs: Map<String, Value>,

    /// Opaque error payload reported on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

fn default_node_status() -> NodeStatus {
    NodeStatus::Pending
}

impl Node {
    /// Effective cost tier: the explicit constraint when present,
    /// otherwise the role's default.
    pub fn tier(&self) -> CostTier {
        self.constraints.cost_tier.unwrap_or(self.role.default_tier())
    }
}

/// Scheduling constraints attached to a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConstraints {
    /// Explicit cost tier override; defaults from the role when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_tier: Option<CostTier>,

    /// Whether this node may run as background work.
    #[serde(default)]
    pub background: bool,

    /// Number of explicit retries this node has been granted.
    #[serde(default)]
    pub retry_count: u32,
}

/// A directed dependency between two nodes with a trigger condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub condition: EdgeCondition,
}

/// Execution bookkeeping mirrored into the graph document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default)]
    pub current_phase: u32,
    #[serde(default)]
    pub active_nodes: Vec<NodeId>,
    #[serde(default)]
    pub completed_nodes: Vec<NodeId>,
    #[serde(default)]
    pub failed_nodes: Vec<NodeId>,
}

/// A task graph instance: the unit the scheduler owns and mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGraph {
    pub id: GraphId,
    pub track: Track,
    pub title: String,
    pub status: GraphStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// The task description this graph was instantiated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default)]
    pub execution: ExecutionState,
}

impl TaskGraph {
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    /// All edges pointing at `node_id`.
    pub fn incoming_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == node_id)
    }

    /// All edges originating at `node_id`.
    pub fn outgoing_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == node_id)
    }
}
