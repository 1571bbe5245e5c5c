// src/types.rs

//! Closed enum types shared across the crate.
//!
//! Every externally supplied discriminator (tier, role, track, status,
//! edge condition) is a closed enum rejected at construction time, not a
//! free-form string checked deep inside the scheduling logic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical node identifier type used throughout the crate.
pub type NodeId = String;

/// Canonical task graph identifier type.
pub type GraphId = String;

/// Canonical session identifier type.
pub type SessionId = String;

/// Cost/latency class of a unit of work.
///
/// Each tier has its own concurrency ceiling (admission control) and its
/// own heartbeat thresholds (health monitoring): cheap work runs wide and
/// is given long liveness windows; expensive work runs narrow and is
/// expected to respond quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Cheap,
    Medium,
    Expensive,
}

impl CostTier {
    /// All tiers, in scheduling order (cheap batches admit first).
    pub const ALL: [CostTier; 3] = [CostTier::Cheap, CostTier::Medium, CostTier::Expensive];
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostTier::Cheap => "cheap",
            CostTier::Medium => "medium",
            CostTier::Expensive => "expensive",
        };
        f.write_str(s)
    }
}

impl FromStr for CostTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cheap" => Ok(CostTier::Cheap),
            "medium" => Ok(CostTier::Medium),
            "expensive" => Ok(CostTier::Expensive),
            other => Err(format!(
                "invalid cost tier: {other} (expected \"cheap\", \"medium\" or \"expensive\")"
            )),
        }
    }
}

/// Capability class of a worker node.
///
/// The role determines the default cost tier when a node's constraints do
/// not name one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Codebase exploration and search.
    Scout,
    /// Requirement analysis and understanding.
    Analyst,
    /// Review and defect detection.
    Reviewer,
    /// Testing and documentation.
    Tester,
    /// Implementation work.
    Builder,
    /// Design and decision making.
    Architect,
}

impl Role {
    /// Default cost tier for this role.
    pub fn default_tier(self) -> CostTier {
        match self {
            Role::Scout | Role::Reviewer => CostTier::Cheap,
            Role::Analyst | Role::Tester => CostTier::Medium,
            Role::Builder | Role::Architect => CostTier::Expensive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Scout => "scout",
            Role::Analyst => "analyst",
            Role::Reviewer => "reviewer",
            Role::Tester => "tester",
            Role::Builder => "builder",
            Role::Architect => "architect",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scout" => Ok(Role::Scout),
            "analyst" => Ok(Role::Analyst),
            "reviewer" => Ok(Role::Reviewer),
            "tester" => Ok(Role::Tester),
            "builder" => Ok(Role::Builder),
            "architect" => Ok(Role::Architect),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

/// Workflow track a task graph was instantiated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Fix,
    Feature,
    Refactor,
    Direct,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Track::Fix => "fix",
            Track::Feature => "feature",
            Track::Refactor => "refactor",
            Track::Direct => "direct",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fix" => Ok(Track::Fix),
            "feature" => Ok(Track::Feature),
            "refactor" => Ok(Track::Refactor),
            "direct" => Ok(Track::Direct),
            other => Err(format!(
                "invalid track: {other} (expected \"fix\", \"feature\", \"refactor\" or \"direct\")"
            )),
        }
    }
}

/// Status of a single node in a task graph.
///
/// Legal transitions: pending -> running -> (done | failed). A failed node
/// returns to pending only through an explicit retry, which bumps the
/// node's retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Done,
    Failed,
    Blocked,
}

impl NodeStatus {
    /// Whether this status is terminal for a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Done | NodeStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Done => "done",
            NodeStatus::Failed => "failed",
            NodeStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStatus {
    Created,
    Running,
    Paused,
    Completed,
    Aborted,
}

impl fmt::Display for GraphStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GraphStatus::Created => "created",
            GraphStatus::Running => "running",
            GraphStatus::Paused => "paused",
            GraphStatus::Completed => "completed",
            GraphStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Condition attached to a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCondition {
    #[default]
    OnSuccess,
    OnFailure,
    Always,
}

impl EdgeCondition {
    /// Whether the source node's status satisfies this condition.
    pub fn is_satisfied_by(self, source_status: NodeStatus) -> bool {
        match self {
            EdgeCondition::OnSuccess => source_status == NodeStatus::Done,
            EdgeCondition::OnFailure => source_status == NodeStatus::Failed,
            EdgeCondition::Always => source_status.is_terminal(),
        }
    }
}
