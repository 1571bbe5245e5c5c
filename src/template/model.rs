// src/template/model.rs

use serde::{Deserialize, Serialize};

use crate::graph::{Edge, Node};
use crate::types::Track;

/// A track template as loaded from `<track>_track.json`.
///
/// Templates carry the same node/edge shape as a task graph; instantiation
/// deep-copies them, so node statuses and outputs present in a template
/// file are ignored and reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackTemplate {
    pub track: Track,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}
