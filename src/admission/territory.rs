// src/admission/territory.rs

//! Declared exclusive claims over logical resources.
//!
//! Territories are advisory: they are the sole mutual-exclusion primitive
//! in the core, and anything undeclared is assumed safe to touch
//! concurrently. The resource key is semantic (usually, but not
//! necessarily, a file path), so this is an explicit holder map with a
//! conflict predicate rather than OS-level file locking.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// An ownerless claim as declared by a node (in a template or graph
/// document). `subunit: None` claims the whole resource; `Some(name)`
/// claims one named subunit of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryClaim {
    /// Logical resource key, e.g. a file path or module name.
    pub resource: String,

    /// Named subunit of the resource (e.g. a function), or `None` for the
    /// whole resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subunit: Option<String>,
}

impl TerritoryClaim {
    pub fn whole(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            subunit: None,
        }
    }

    pub fn subunit(resource: impl Into<String>, subunit: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            subunit: Some(subunit.into()),
        }
    }

    /// Two claims conflict iff they name the same resource and either
    /// claims the whole resource or both name the same subunit.
    pub fn conflicts_with(&self, other: &TerritoryClaim) -> bool {
        if self.resource != other.resource {
            return false;
        }
        match (&self.subunit, &other.subunit) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }

    /// Map key identifying this claim in the holder table.
    pub fn key(&self) -> String {
        match &self.subunit {
            Some(sub) => format!("{}::{}", self.resource, sub),
            None => format!("{}::*", self.resource),
        }
    }
}

/// A recorded claim: a [`TerritoryClaim`] plus the node holding it.
///
/// Held exclusively until the owning node completes or fails, then
/// released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subunit: Option<String>,
    pub owner: NodeId,
}

impl Territory {
    pub fn new(claim: &TerritoryClaim, owner: impl Into<NodeId>) -> Self {
        Self {
            resource: claim.resource.clone(),
            subunit: claim.subunit.clone(),
            owner: owner.into(),
        }
    }

    pub fn claim(&self) -> TerritoryClaim {
        TerritoryClaim {
            resource: self.resource.clone(),
            subunit: self.subunit.clone(),
        }
    }
}
