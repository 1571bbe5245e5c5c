// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Invalid status transition for node '{node}': {from} -> {to}")]
    InvalidTransition {
        node: String,
        from: String,
        to: String,
    },

    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    #[error("Invalid event source: {0}")]
    InvalidEventSource(String),

    #[error("Task graph unreadable: {0}")]
    GraphUnreadable(String),

    #[error("No active task graph to resume")]
    NoActiveGraph,

    #[error("Task graph is already completed")]
    AlreadyCompleted,

    #[error("Nothing to resume: graph is running with no interrupted nodes")]
    NothingToResume,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OrchdagError>;
