// src/graph/scheduler.rs

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{OrchdagError, Result};
use crate::graph::model::{ExecutionState, Node, TaskGraph};
use crate::template::{load_template, TrackTemplate};
use crate::types::{GraphId, GraphStatus, NodeId, NodeStatus, Track};

/// Scheduler for task graph execution.
///
/// It is responsible for:
/// - loading track templates and instantiating task graphs from them
/// - deciding which pending nodes are "ready" (all incoming edge
///   conditions satisfied by their sources' statuses)
/// - applying node status transitions and mirroring them into the graph's
///   execution bookkeeping
/// - producing a cycle-free ordering of the graph
///
/// The scheduler never blocks on the work itself: "running" only records
/// that an external worker was handed the node.
#[derive(Debug, Clone)]
pub struct Scheduler {
    template_dir: PathBuf,
}

impl Scheduler {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Load and validate the template for `track` from the template
    /// directory.
    pub fn load_template(&self, track: Track) -> Result<TrackTemplate> {
        load_template(&self.template_dir, track)
    }

    /// Create a fresh task graph instance from a template.
    ///
    /// The template is deep-copied; the instance gets a new unique id, all
    /// nodes reset to pending with empty outputs, and zeroed execution
    /// bookkeeping.
    pub fn instantiate(
        &self,
        template: &TrackTemplate,
        description: &str,
        working_dir: Option<&str>,
        tags: Vec<String>,
    ) -> TaskGraph {
        let now = Utc::now();
        let id = generate_graph_id();

        let mut nodes = template.nodes.clone();
        for node in &mut nodes {
            node.status = NodeStatus::Pending;
            node.outputs = Map::new();
            node.error = None;
            node.constraints.retry_count = 0;
        }

        let title = graph_title(template.track, description);

        info!(
            graph_id = %id,
            track = %template.track,
            nodes = nodes.len(),
            "instantiated task graph from template"
        );

        TaskGraph {
            id,
            track: template.track,
            title,
            status: GraphStatus::Created,
            created_at: now,
            updated_at: now,
            description: Some(description.to_string()),
            working_dir: working_dir.map(|s| s.to_string()),
            tags,
            nodes,
            edges: template.edges.clone(),
            execution: ExecutionState::default(),
        }
    }

    /// All nodes that are ready for execution.
    ///
    /// A pending node is ready iff every incoming edge's condition is
    /// satisfied by its source's status; nodes with no incoming edges are
    /// ready as soon as they are pending, regardless of the rest of the
    /// graph.
    pub fn ready_nodes<'g>(&self, graph: &'g TaskGraph) -> Vec<&'g Node> {
        graph
            .nodes
            .iter()
            .filter(|node| node.status == NodeStatus::Pending)
            .filter(|node| self.deps_satisfied(graph, &node.id))
            .collect()
    }

    /// Whether every incoming edge of `node_id` is satisfied.
    pub fn deps_satisfied(&self, graph: &TaskGraph, node_id: &str) -> bool {
        graph.incoming_edges(node_id).all(|edge| {
            match graph.node(&edge.from) {
                Some(source) => edge.condition.is_satisfied_by(source.status),
                None => {
                    // Unknown source means the edge can never fire.
                    warn!(
                        node = %node_id,
                        dep = %edge.from,
                        "edge references a node missing from the graph"
                    );
                    false
                }
            }
        })
    }

    /// Apply a status transition to a node, mirroring the graph's
    /// execution sets and refreshing the graph status.
    ///
    /// Fails with `UnknownNode` for an id not in the graph, and with
    /// `InvalidTransition` when a failed node is moved back to pending
    /// outside of [`Scheduler::retry_node`]. Set-membership updates are
    /// idempotent: re-marking a node leaves it in the corresponding set
    /// exactly once.
    pub fn mark_status(
        &self,
        graph: &mut TaskGraph,
        node_id: &str,
        status: NodeStatus,
        outputs: Option<Map<String, Value>>,
        error: Option<Value>,
    ) -> Result<()> {
        let node = graph
            .node_mut(node_id)
            .ok_or_else(|| OrchdagError::UnknownNode(node_id.to_string()))?;

        if node.status == NodeStatus::Failed && status == NodeStatus::Pending {
            return Err(OrchdagError::InvalidTransition {
                node: node_id.to_string(),
                from: node.status.to_string(),
                to: status.to_string(),
            });
        }

        debug!(node = %node_id, from = %node.status, to = %status, "node status transition");

        node.status = status;
        if status == NodeStatus::Done {
            if let Some(outputs) = outputs {
                node.outputs = outputs;
            }
        }
        if status == NodeStatus::Failed {
            if let Some(error) = error {
                node.error = Some(error);
            }
        }

        mirror_execution_sets(&mut graph.execution, node_id, status);
        graph.status = self.graph_status(graph);
        graph.updated_at = Utc::now();

        Ok(())
    }

    /// Explicitly retry a failed node: move it back to pending and bump
    /// its retry count. This is the only legal failed -> pending path.
    ///
    /// Returns the new retry count.
    pub fn retry_node(&self, graph: &mut TaskGraph, node_id: &str) -> Result<u32> {
        let node = graph
            .node_mut(node_id)
            .ok_or_else(|| OrchdagError::UnknownNode(node_id.to_string()))?;

        if node.status != NodeStatus::Failed {
            return Err(OrchdagError::InvalidTransition {
                node: node_id.to_string(),
                from: node.status.to_string(),
                to: NodeStatus::Pending.to_string(),
            });
        }

        node.status = NodeStatus::Pending;
        node.error = None;
        node.constraints.retry_count += 1;
        let count = node.constraints.retry_count;

        info!(node = %node_id, retry_count = count, "retrying failed node");

        graph.execution.failed_nodes.retain(|id| id != node_id);
        graph.status = self.graph_status(graph);
        graph.updated_at = Utc::now();

        Ok(count)
    }

    /// Reset previously-active nodes back to pending after an interrupted
    /// run, so readiness is recomputed instead of assuming they are still
    /// in flight.
    pub fn reset_interrupted(&self, graph: &mut TaskGraph, interrupted: &[NodeId]) {
        for node_id in interrupted {
            if let Some(node) = graph.node_mut(node_id) {
                if node.status == NodeStatus::Running {
                    debug!(node = %node_id, "resetting interrupted node to pending");
                    node.status = NodeStatus::Pending;
                }
            } else {
                warn!(node = %node_id, "interrupted node not present in graph; ignoring");
            }
            graph.execution.active_nodes.retain(|id| id != node_id);
        }
        graph.status = self.graph_status(graph);
        graph.updated_at = Utc::now();
    }

    /// Node ids in a dependency-respecting order (Kahn's algorithm).
    ///
    /// Fails with `DagCycle` if nodes remain unprocessed once the
    /// zero-in-degree queue empties.
    pub fn topological_order(&self, graph: &TaskGraph) -> Result<Vec<NodeId>> {
        let mut in_degree: HashMap<&str, usize> =
            graph.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        let mut adjacency: HashMap<&str, Vec<&str>> =
            graph.nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();

        for edge in &graph.edges {
            // Edges with unknown endpoints were rejected at template
            // validation; skip them here rather than panic on a hand-edited
            // document.
            if adjacency.contains_key(edge.from.as_str())
                && in_degree.contains_key(edge.to.as_str())
            {
                if let Some(deps) = adjacency.get_mut(edge.from.as_str()) {
                    deps.push(edge.to.as_str());
                }
                if let Some(degree) = in_degree.get_mut(edge.to.as_str()) {
                    *degree += 1;
                }
            }
        }

        // Seed with roots in document order for a deterministic result.
        let mut queue: VecDeque<&str> = graph
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree[id] == 0)
            .collect();

        let mut order: Vec<NodeId> = Vec::with_capacity(graph.nodes.len());

        while let Some(node_id) = queue.pop_front() {
            order.push(node_id.to_string());

            for &next in &adjacency[node_id] {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() != graph.nodes.len() {
            let stuck: Vec<&str> = graph
                .nodes
                .iter()
                .map(|n| n.id.as_str())
                .filter(|id| !order.iter().any(|o| o == id))
                .collect();
            return Err(OrchdagError::DagCycle(format!(
                "nodes unreachable by topological order: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    /// Whether every node is terminal (done or failed).
    pub fn is_complete(&self, graph: &TaskGraph) -> bool {
        graph.nodes.iter().all(|n| n.status.is_terminal())
    }

    /// Overall graph status as a pure function of node statuses:
    ///
    /// - any node running => running
    /// - no pending and no running => completed
    /// - pending nodes exist, none running, at least one failed => aborted
    ///   (blocked on a failure; only an explicit retry can unblock)
    /// - otherwise => created
    pub fn graph_status(&self, graph: &TaskGraph) -> GraphStatus {
        if graph.nodes.is_empty() {
            return GraphStatus::Created;
        }

        let mut has_running = false;
        let mut has_pending = false;
        let mut has_failed = false;

        for node in &graph.nodes {
            match node.status {
                NodeStatus::Running => has_running = true,
                NodeStatus::Pending | NodeStatus::Blocked => has_pending = true,
                NodeStatus::Failed => has_failed = true,
                NodeStatus::Done => {}
            }
        }

        if has_running {
            GraphStatus::Running
        } else if !has_pending {
            GraphStatus::Completed
        } else if has_failed {
            GraphStatus::Aborted
        } else {
            GraphStatus::Created
        }
    }

    /// Ids of the immediate dependents of a node.
    pub fn downstream(&self, graph: &TaskGraph, node_id: &str) -> Vec<NodeId> {
        graph
            .outgoing_edges(node_id)
            .map(|e| e.to.clone())
            .collect()
    }

    /// Ids of the immediate dependencies of a node.
    pub fn upstream(&self, graph: &TaskGraph, node_id: &str) -> Vec<NodeId> {
        graph
            .incoming_edges(node_id)
            .map(|e| e.from.clone())
            .collect()
    }

    /// Summary of the execution state, for diagnostics and status output.
    pub fn execution_summary(&self, graph: &TaskGraph) -> ExecutionSummary {
        let mut by_status: HashMap<NodeStatus, Vec<NodeId>> = HashMap::new();
        for node in &graph.nodes {
            by_status.entry(node.status).or_default().push(node.id.clone());
        }

        let total = graph.nodes.len();
        let done = by_status
            .get(&NodeStatus::Done)
            .map(|v| v.len())
            .unwrap_or(0);
        let progress_percent = if total == 0 {
            0.0
        } else {
            done as f64 / total as f64 * 100.0
        };

        ExecutionSummary {
            total_nodes: total,
            pending: counts_for(&by_status, NodeStatus::Pending),
            running: counts_for(&by_status, NodeStatus::Running),
            done: counts_for(&by_status, NodeStatus::Done),
            failed: counts_for(&by_status, NodeStatus::Failed),
            blocked: counts_for(&by_status, NodeStatus::Blocked),
            progress_percent,
            status: self.graph_status(graph),
        }
    }
}

/// Per-status id list with its count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub count: usize,
    pub nodes: Vec<NodeId>,
}

/// Snapshot of where a graph's execution currently stands.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub total_nodes: usize,
    pub pending: StatusCounts,
    pub running: StatusCounts,
    pub done: StatusCounts,
    pub failed: StatusCounts,
    pub blocked: StatusCounts,
    pub progress_percent: f64,
    pub status: GraphStatus,
}

fn counts_for(by_status: &HashMap<NodeStatus, Vec<NodeId>>, status: NodeStatus) -> StatusCounts {
    match by_status.get(&status) {
        Some(nodes) => StatusCounts {
            count: nodes.len(),
            nodes: nodes.clone(),
        },
        None => StatusCounts::default(),
    }
}

/// Keep the execution id sets consistent with a node's new status.
fn mirror_execution_sets(execution: &mut ExecutionState, node_id: &str, status: NodeStatus) {
    if status == NodeStatus::Running {
        if !execution.active_nodes.iter().any(|id| id == node_id) {
            execution.active_nodes.push(node_id.to_string());
        }
    } else {
        execution.active_nodes.retain(|id| id != node_id);
    }

    if status == NodeStatus::Done && !execution.completed_nodes.iter().any(|id| id == node_id) {
        execution.completed_nodes.push(node_id.to_string());
    }

    if status == NodeStatus::Failed && !execution.failed_nodes.iter().any(|id| id == node_id) {
        execution.failed_nodes.push(node_id.to_string());
    }
}

/// Generate a unique graph id (`tg_` + 12 hex chars).
fn generate_graph_id() -> GraphId {
    let hex = Uuid::new_v4().simple().to_string();
    format!("tg_{}", &hex[..12])
}

fn graph_title(track: Track, description: &str) -> String {
    let mut prefix: String = track.as_str().to_string();
    if let Some(first) = prefix.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    let short: String = description.chars().take(50).collect();
    format!("{prefix}: {short}")
}
