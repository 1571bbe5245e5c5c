// src/graph/store.rs

//! Task graph persistence.
//!
//! The graph document is written with the same crash-safe replace pattern
//! as every other persisted document. Unlike the state snapshot there is
//! no safe default for a graph, so an unreadable document propagates a
//! hard fault instead of being silently substituted.

use std::path::Path;

use tracing::debug;

use crate::errors::{OrchdagError, Result};
use crate::fs::{atomic_write_json, read_json};
use crate::graph::model::TaskGraph;

/// Atomically persist a task graph document.
pub fn save_graph(path: &Path, graph: &TaskGraph) -> Result<()> {
    debug!(graph_id = %graph.id, path = %path.display(), "persisting task graph");
    atomic_write_json(path, graph)
}

/// Load a task graph document.
///
/// Fails with `GraphUnreadable` when the file is missing, unparsable, or
/// structurally invalid.
pub fn load_graph(path: &Path) -> Result<TaskGraph> {
    read_json::<TaskGraph>(path).map_err(|e| {
        OrchdagError::GraphUnreadable(format!("{}: {e}", path.display()))
    })
}
