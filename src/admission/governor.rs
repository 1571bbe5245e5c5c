// src/admission/governor.rs

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::admission::territory::{Territory, TerritoryClaim};
use crate::config::LimitsSection;
use crate::graph::{Node, TaskGraph};
use crate::types::{CostTier, NodeId};

/// Per-tier concurrency ceilings.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    pub cheap: usize,
    pub medium: usize,
    pub expensive: usize,
}

impl TierLimits {
    pub fn limit_for(&self, tier: CostTier) -> usize {
        match tier {
            CostTier::Cheap => self.cheap,
            CostTier::Medium => self.medium,
            CostTier::Expensive => self.expensive,
        }
    }
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            cheap: 10,
            medium: 3,
            expensive: 1,
        }
    }
}

impl From<LimitsSection> for TierLimits {
    fn from(section: LimitsSection) -> Self {
        Self {
            cheap: section.cheap,
            medium: section.medium,
            expensive: section.expensive,
        }
    }
}

/// Currently running node ids grouped by cost tier.
#[derive(Debug, Clone, Default)]
pub struct ActiveByTier {
    by_tier: HashMap<CostTier, Vec<NodeId>>,
}

impl ActiveByTier {
    /// Derive the active-by-tier view from a graph's execution state.
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let mut by_tier: HashMap<CostTier, Vec<NodeId>> = HashMap::new();
        for node_id in &graph.execution.active_nodes {
            if let Some(node) = graph.node(node_id) {
                by_tier.entry(node.tier()).or_default().push(node_id.clone());
            }
        }
        Self { by_tier }
    }

    pub fn count(&self, tier: CostTier) -> usize {
        self.by_tier.get(&tier).map(|v| v.len()).unwrap_or(0)
    }

    pub fn insert(&mut self, tier: CostTier, node_id: impl Into<NodeId>) {
        self.by_tier.entry(tier).or_default().push(node_id.into());
    }
}

/// Why a ready node may not start now.
///
/// These are routine flow control, not errors: the caller retries later
/// (dependency/tier/territory pressure resolves as other work finishes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// A dependency has not reached the status its edge requires.
    BlockedByDependency(NodeId),
    /// The node's tier is already running at its ceiling.
    TierLimitReached {
        tier: CostTier,
        active: usize,
        limit: usize,
    },
    /// Declared territories collide with held claims (owners listed).
    TerritoryConflict(Vec<String>),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::BlockedByDependency(dep) => {
                write!(f, "blocked by dependency: {dep}")
            }
            DenialReason::TierLimitReached {
                tier,
                active,
                limit,
            } => {
                write!(f, "tier limit reached for {tier} ({active}/{limit})")
            }
            DenialReason::TerritoryConflict(owners) => {
                write!(f, "territory conflict: {}", owners.join(", "))
            }
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied(DenialReason),
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

/// Filters ready nodes down to what may actually start now.
///
/// Holds the territory claim table (keyed by resource + granularity) and
/// the per-tier ceilings. Territories are advisory: they are declared by
/// nodes, recorded here at dispatch, and released when the owning node
/// terminates.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    limits: TierLimits,
    held: HashMap<String, Territory>,
}

impl AdmissionController {
    pub fn new(limits: TierLimits) -> Self {
        Self {
            limits,
            held: HashMap::new(),
        }
    }

    pub fn limits(&self) -> TierLimits {
        self.limits
    }

    /// Currently held territories, for diagnostics.
    pub fn held_territories(&self) -> impl Iterator<Item = &Territory> {
        self.held.values()
    }

    /// Whether `node` may transition to running now. Side-effect free:
    /// territory claims are only recorded by [`AdmissionController::claim`].
    ///
    /// Checks in order:
    /// (a) every incoming edge is satisfied by its source's status,
    /// (b) the node's tier is below its concurrency ceiling,
    /// (c) the node's declared territories collide with nothing held.
    pub fn can_start(
        &self,
        node: &Node,
        graph: &TaskGraph,
        active: &ActiveByTier,
    ) -> Admission {
        for edge in graph.incoming_edges(&node.id) {
            let satisfied = graph
                .node(&edge.from)
                .map(|source| edge.condition.is_satisfied_by(source.status))
                .unwrap_or(false);
            if !satisfied {
                return Admission::Denied(DenialReason::BlockedByDependency(edge.from.clone()));
            }
        }

        let tier = node.tier();
        let limit = self.limits.limit_for(tier);
        let active_count = active.count(tier);
        if active_count >= limit {
            return Admission::Denied(DenialReason::TierLimitReached {
                tier,
                active: active_count,
                limit,
            });
        }

        let conflicts = self.conflicts_for(&node.id, &node.territories);
        if !conflicts.is_empty() {
            return Admission::Denied(DenialReason::TerritoryConflict(conflicts));
        }

        Admission::Granted
    }

    /// Conflicting held claims for a prospective owner, as
    /// `"resource (owned by node)"` strings. Claims already held by the
    /// same owner never conflict with themselves.
    pub fn conflicts_for(&self, owner: &str, claims: &[TerritoryClaim]) -> Vec<String> {
        let mut conflicts = Vec::new();
        for claim in claims {
            for held in self.held.values() {
                if held.owner != owner && claim.conflicts_with(&held.claim()) {
                    conflicts.push(format!("{} (owned by {})", held.resource, held.owner));
                }
            }
        }
        conflicts
    }

    /// Record `claims` for `owner`, all-or-nothing.
    ///
    /// Returns the conflict list: empty means every claim was recorded;
    /// non-empty means nothing was recorded.
    pub fn claim(&mut self, owner: &str, claims: &[TerritoryClaim]) -> Vec<String> {
        let conflicts = self.conflicts_for(owner, claims);
        if !conflicts.is_empty() {
            warn!(
                owner = %owner,
                conflicts = conflicts.len(),
                "territory claim rejected"
            );
            return conflicts;
        }

        for claim in claims {
            self.held
                .insert(claim.key(), Territory::new(claim, owner));
        }
        if !claims.is_empty() {
            debug!(owner = %owner, claims = claims.len(), "territories claimed");
        }

        Vec::new()
    }

    /// Release everything held by `owner`. Idempotent.
    pub fn release(&mut self, owner: &str) {
        let before = self.held.len();
        self.held.retain(|_, t| t.owner != owner);
        let released = before - self.held.len();
        if released > 0 {
            debug!(owner = %owner, released, "territories released");
        }
    }

    /// Admit a batch of ready nodes within the per-tier ceilings.
    ///
    /// Nodes are grouped by tier and admitted up to `ceiling - active`
    /// per tier, preserving input order. This is a greedy, not globally
    /// optimal, scheduler: it never reorders within a tier and never
    /// starves one tier for another. Territory claims are the caller's
    /// job at dispatch time.
    pub fn next_batch<'n>(
        &self,
        ready: &[&'n Node],
        active: &ActiveByTier,
    ) -> Vec<&'n Node> {
        let mut by_tier: HashMap<CostTier, Vec<&'n Node>> = HashMap::new();
        for node in ready {
            by_tier.entry(node.tier()).or_default().push(*node);
        }

        let mut batch = Vec::new();
        for tier in CostTier::ALL {
            let Some(candidates) = by_tier.get(&tier) else {
                continue;
            };
            let limit = self.limits.limit_for(tier);
            let slots = limit.saturating_sub(active.count(tier));
            for node in candidates.iter().take(slots) {
                batch.push(*node);
            }
            if candidates.len() > slots {
                info!(
                    tier = %tier,
                    ready = candidates.len(),
                    admitted = slots,
                    "tier ceiling deferred ready nodes"
                );
            }
        }

        batch
    }
}
