// src/state/store.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::errors::{OrchdagError, Result};
use crate::fs::{atomic_write_json, read_json};
use crate::state::snapshot::{ResumePlan, RunStatus, StatePatch, StateSnapshot};
use crate::types::NodeId;

/// Crash-safe store for the single state snapshot document.
///
/// Reads never fail: an absent or corrupt document yields the idle
/// default. Writes merge a [`StatePatch`] into the current snapshot,
/// stamp `updated_at` and perform one atomic replace, so a crash
/// mid-write always leaves the previous valid snapshot on disk.
///
/// Concurrent processes serialize through the atomic replace; the last
/// writer wins at document granularity.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot, substituting the idle default when the
    /// document is absent or corrupt. Corruption never raises.
    pub fn read(&self) -> StateSnapshot {
        if !self.path.exists() {
            return StateSnapshot::default();
        }

        match read_json::<StateSnapshot>(&self.path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "state snapshot unreadable; substituting idle default"
                );
                StateSnapshot::default()
            }
        }
    }

    /// Merge `patch` into the current snapshot and persist atomically.
    ///
    /// Returns the snapshot as written.
    pub fn write(&self, patch: StatePatch) -> Result<StateSnapshot> {
        let mut snapshot = self.read();
        patch.apply(&mut snapshot);
        snapshot.updated_at = Some(Utc::now());

        atomic_write_json(&self.path, &snapshot)?;
        debug!(path = %self.path.display(), status = %snapshot.status, "state snapshot written");

        Ok(snapshot)
    }

    /// Reset the snapshot to the idle default (administrative reset).
    pub fn reset(&self) -> Result<StateSnapshot> {
        let snapshot = StateSnapshot {
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        atomic_write_json(&self.path, &snapshot)?;
        Ok(snapshot)
    }

    /// Record the start of a new graph execution.
    pub fn start_graph(&self, graph_id: &str, session_id: &str) -> Result<StateSnapshot> {
        info!(graph_id = %graph_id, session_id = %session_id, "starting graph execution");
        self.write(StatePatch {
            current_graph_id: Some(graph_id.to_string()),
            session_id: Some(session_id.to_string()),
            status: Some(RunStatus::Running),
            current_phase: Some(0),
            active_nodes: Some(Vec::new()),
            completed_nodes: Some(Vec::new()),
            failed_nodes: Some(Vec::new()),
            ..Default::default()
        })
    }

    /// Add a node to the active set. Re-adding an existing id is a no-op.
    pub fn activate_node(&self, node_id: &str) -> Result<StateSnapshot> {
        let snapshot = self.read();
        let mut active = snapshot.active_nodes;
        if !active.iter().any(|id| id == node_id) {
            active.push(node_id.to_string());
        }
        self.write(StatePatch {
            active_nodes: Some(active),
            ..Default::default()
        })
    }

    /// Move a node from the active set to the completed set.
    pub fn complete_node(&self, node_id: &str) -> Result<StateSnapshot> {
        let snapshot = self.read();

        let mut active = snapshot.active_nodes;
        active.retain(|id| id != node_id);

        let mut completed = snapshot.completed_nodes;
        if !completed.iter().any(|id| id == node_id) {
            completed.push(node_id.to_string());
        }

        self.write(StatePatch {
            active_nodes: Some(active),
            completed_nodes: Some(completed),
            ..Default::default()
        })
    }

    /// Move a node from the active set to the failed set.
    pub fn fail_node(&self, node_id: &str) -> Result<StateSnapshot> {
        let snapshot = self.read();

        let mut active = snapshot.active_nodes;
        active.retain(|id| id != node_id);

        let mut failed = snapshot.failed_nodes;
        if !failed.iter().any(|id| id == node_id) {
            failed.push(node_id.to_string());
        }

        self.write(StatePatch {
            active_nodes: Some(active),
            failed_nodes: Some(failed),
            ..Default::default()
        })
    }

    /// Record a retry for a node: bump its retry count and clear it from
    /// the failed set so it can be re-admitted.
    pub fn record_retry(&self, node_id: &str) -> Result<StateSnapshot> {
        let snapshot = self.read();

        let mut retry_counts = snapshot.retry_counts;
        *retry_counts.entry(node_id.to_string()).or_insert(0) += 1;

        let mut failed = snapshot.failed_nodes;
        failed.retain(|id| id != node_id);

        self.write(StatePatch {
            retry_counts: Some(retry_counts),
            failed_nodes: Some(failed),
            ..Default::default()
        })
    }

    /// Retry count recorded for a node.
    pub fn retry_count(&self, node_id: &str) -> u32 {
        self.read().retry_counts.get(node_id).copied().unwrap_or(0)
    }

    /// Advance to the next execution phase.
    pub fn advance_phase(&self) -> Result<StateSnapshot> {
        let snapshot = self.read();
        self.write(StatePatch {
            current_phase: Some(snapshot.current_phase + 1),
            ..Default::default()
        })
    }

    /// Pause the current graph execution.
    pub fn pause_graph(&self) -> Result<StateSnapshot> {
        self.write(StatePatch {
            status: Some(RunStatus::Paused),
            ..Default::default()
        })
    }

    /// Abort the current graph execution. Terminal and non-undoable.
    pub fn abort_graph(&self, reason: Option<&str>) -> Result<StateSnapshot> {
        self.write(StatePatch {
            status: Some(RunStatus::Aborted),
            active_nodes: Some(Vec::new()),
            abort_reason: reason.map(|s| s.to_string()),
            ..Default::default()
        })
    }

    /// Mark the current graph as completed.
    pub fn complete_graph(&self) -> Result<StateSnapshot> {
        self.write(StatePatch {
            status: Some(RunStatus::Completed),
            active_nodes: Some(Vec::new()),
            ..Default::default()
        })
    }

    /// Nodes that were in flight when execution was interrupted.
    pub fn interrupted_nodes(&self) -> Vec<NodeId> {
        self.read().active_nodes
    }

    /// Prepare the snapshot for resuming an interrupted execution.
    ///
    /// The previously-active ids are returned as "interrupted" and
    /// atomically cleared from the active set while the status is set to
    /// running, so the caller re-derives readiness for them instead of
    /// assuming they are still in flight. A crash between a state write
    /// and an event append can leave the two slightly out of sync; this
    /// treats "active" as "needs re-admission", which tolerates that.
    pub fn prepare_for_resume(&self) -> Result<ResumePlan> {
        let snapshot = self.read();

        let graph_id = snapshot
            .current_graph_id
            .clone()
            .ok_or(OrchdagError::NoActiveGraph)?;

        if snapshot.status == RunStatus::Completed {
            return Err(OrchdagError::AlreadyCompleted);
        }

        if snapshot.status == RunStatus::Running && snapshot.active_nodes.is_empty() {
            return Err(OrchdagError::NothingToResume);
        }

        let interrupted = snapshot.active_nodes.clone();

        self.write(StatePatch {
            status: Some(RunStatus::Running),
            active_nodes: Some(Vec::new()),
            ..Default::default()
        })?;

        info!(
            graph_id = %graph_id,
            resumed = interrupted.len(),
            "prepared state for resume; interrupted nodes cleared for re-admission"
        );

        Ok(ResumePlan {
            graph_id,
            resumed_nodes: interrupted,
        })
    }
}
