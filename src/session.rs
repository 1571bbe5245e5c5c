// src/session.rs

//! Session directory layout.
//!
//! A session keeps all persisted documents for one orchestration run under
//! a single root directory:
//!
//! ```text
//! <root>/
//!   state.json       current runtime state snapshot
//!   events.jsonl     append-only event log
//!   taskgraph.json   active task graph document
//!   templates/       track templates (input only)
//! ```

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::types::SessionId;

/// Resolves the persisted-document paths for one session root.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn events_file(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn graph_file(&self) -> PathBuf {
        self.root.join("taskgraph.json")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root.join("templates")
    }
}

/// Generate a fresh session id (`sess_` + 8 hex chars).
pub fn generate_session_id() -> SessionId {
    let hex = Uuid::new_v4().simple().to_string();
    format!("sess_{}", &hex[..8])
}
