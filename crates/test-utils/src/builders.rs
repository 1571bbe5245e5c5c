#![allow(dead_code)]

use orchdag::admission::TerritoryClaim;
use orchdag::graph::{Edge, Node, NodeConstraints, TaskGraph};
use orchdag::template::TrackTemplate;
use orchdag::types::{CostTier, EdgeCondition, NodeStatus, Role, Track};

/// Builder for [`TrackTemplate`] to simplify test setup.
pub struct TemplateBuilder {
    template: TrackTemplate,
}

impl TemplateBuilder {
    pub fn new(track: Track) -> Self {
        Self {
            template: TrackTemplate {
                track,
                title: format!("{track} track"),
                description: None,
                nodes: Vec::new(),
                edges: Vec::new(),
            },
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.template.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, from: &str, to: &str, condition: EdgeCondition) -> Self {
        self.template.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            condition,
        });
        self
    }

    pub fn build(self) -> TrackTemplate {
        orchdag::template::validate_template(&self.template)
            .expect("Failed to build valid template from builder");
        self.template
    }

    /// Build without validation, for tests that exercise invalid input.
    pub fn build_unchecked(self) -> TrackTemplate {
        self.template
    }
}

/// Builder for [`Node`].
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            node: Node {
                id: id.to_string(),
                role,
                title: id.to_string(),
                status: NodeStatus::Pending,
                constraints: NodeConstraints::default(),
                territories: Vec::new(),
                outputs: serde_json::Map::new(),
                error: None,
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.node.title = title.to_string();
        self
    }

    pub fn tier(mut self, tier: CostTier) -> Self {
        self.node.constraints.cost_tier = Some(tier);
        self
    }

    pub fn background(mut self, val: bool) -> Self {
        self.node.constraints.background = val;
        self
    }

    pub fn status(mut self, status: NodeStatus) -> Self {
        self.node.status = status;
        self
    }

    pub fn territory(mut self, resource: &str) -> Self {
        self.node.territories.push(TerritoryClaim::whole(resource));
        self
    }

    pub fn territory_subunit(mut self, resource: &str, subunit: &str) -> Self {
        self.node
            .territories
            .push(TerritoryClaim::subunit(resource, subunit));
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

/// Instantiate a graph from a template with a scheduler rooted at a
/// throwaway template dir.
pub fn instantiate(template: &TrackTemplate, description: &str) -> TaskGraph {
    let scheduler = orchdag::Scheduler::new("templates");
    scheduler.instantiate(template, description, None, Vec::new())
}
