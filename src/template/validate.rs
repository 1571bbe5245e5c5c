// src/template/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{OrchdagError, Result};
use crate::template::model::TrackTemplate;

/// Validate a loaded template before it may be instantiated.
///
/// Checks, in order:
/// - at least one node
/// - node ids are unique
/// - every edge endpoint names a known node
/// - no self-edges
/// - the edge set is acyclic
pub fn validate_template(template: &TrackTemplate) -> Result<()> {
    ensure_has_nodes(template)?;
    validate_node_ids(template)?;
    validate_edge_endpoints(template)?;
    validate_dag(template)?;
    Ok(())
}

fn ensure_has_nodes(template: &TrackTemplate) -> Result<()> {
    if template.nodes.is_empty() {
        return Err(OrchdagError::ConfigError(format!(
            "template '{}' must contain at least one node",
            template.track
        )));
    }
    Ok(())
}

fn validate_node_ids(template: &TrackTemplate) -> Result<()> {
    let mut seen = HashSet::new();
    for node in &template.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(OrchdagError::ConfigError(format!(
                "template '{}' has duplicate node id '{}'",
                template.track, node.id
            )));
        }
    }
    Ok(())
}

fn validate_edge_endpoints(template: &TrackTemplate) -> Result<()> {
    let ids: HashSet<&str> = template.nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in &template.edges {
        if !ids.contains(edge.from.as_str()) {
            return Err(OrchdagError::ConfigError(format!(
                "edge references unknown node '{}' in `from`",
                edge.from
            )));
        }
        if !ids.contains(edge.to.as_str()) {
            return Err(OrchdagError::ConfigError(format!(
                "edge references unknown node '{}' in `to`",
                edge.to
            )));
        }
        if edge.from == edge.to {
            return Err(OrchdagError::ConfigError(format!(
                "node '{}' cannot depend on itself",
                edge.from
            )));
        }
    }
    Ok(())
}

fn validate_dag(template: &TrackTemplate) -> Result<()> {
    // Edge direction: from -> to, i.e. dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in &template.nodes {
        graph.add_node(node.id.as_str());
    }

    for edge in &template.edges {
        graph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(OrchdagError::DagCycle(format!(
                "cycle detected in template edges involving node '{node}'"
            )))
        }
    }
}
