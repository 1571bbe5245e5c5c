// src/events/log.rs

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{OrchdagError, Result};
use crate::session::generate_session_id;
use crate::types::{GraphId, NodeId, SessionId};

/// Event type. Closed enumeration; values outside it are rejected when
/// parsed, not deep inside the logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    GraphCreated,
    NodeScheduled,
    WorkerStart,
    WorkerProgress,
    WorkerStop,
    NodeCompleted,
    NodeFailed,
    NodeBlocked,
    NodeRetried,
    WorkerStalled,
    WorkerTimeout,
    GraphPaused,
    GraphResumed,
    GraphAborted,
    GraphCompleted,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::GraphCreated => "GraphCreated",
            EventType::NodeScheduled => "NodeScheduled",
            EventType::WorkerStart => "WorkerStart",
            EventType::WorkerProgress => "WorkerProgress",
            EventType::WorkerStop => "WorkerStop",
            EventType::NodeCompleted => "NodeCompleted",
            EventType::NodeFailed => "NodeFailed",
            EventType::NodeBlocked => "NodeBlocked",
            EventType::NodeRetried => "NodeRetried",
            EventType::WorkerStalled => "WorkerStalled",
            EventType::WorkerTimeout => "WorkerTimeout",
            EventType::GraphPaused => "GraphPaused",
            EventType::GraphResumed => "GraphResumed",
            EventType::GraphAborted => "GraphAborted",
            EventType::GraphCompleted => "GraphCompleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = OrchdagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GraphCreated" => Ok(EventType::GraphCreated),
            "NodeScheduled" => Ok(EventType::NodeScheduled),
            "WorkerStart" => Ok(EventType::WorkerStart),
            "WorkerProgress" => Ok(EventType::WorkerProgress),
            "WorkerStop" => Ok(EventType::WorkerStop),
            "NodeCompleted" => Ok(EventType::NodeCompleted),
            "NodeFailed" => Ok(EventType::NodeFailed),
            "NodeBlocked" => Ok(EventType::NodeBlocked),
            "NodeRetried" => Ok(EventType::NodeRetried),
            "WorkerStalled" => Ok(EventType::WorkerStalled),
            "WorkerTimeout" => Ok(EventType::WorkerTimeout),
            "GraphPaused" => Ok(EventType::GraphPaused),
            "GraphResumed" => Ok(EventType::GraphResumed),
            "GraphAborted" => Ok(EventType::GraphAborted),
            "GraphCompleted" => Ok(EventType::GraphCompleted),
            other => Err(OrchdagError::InvalidEventType(other.to_string())),
        }
    }
}

/// Where an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    User,
    Scheduler,
    Worker,
    Monitor,
    System,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::User => "user",
            EventSource::Scheduler => "scheduler",
            EventSource::Worker => "worker",
            EventSource::Monitor => "monitor",
            EventSource::System => "system",
        };
        f.write_str(s)
    }
}

impl FromStr for EventSource {
    type Err = OrchdagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(EventSource::User),
            "scheduler" => Ok(EventSource::Scheduler),
            "worker" => Ok(EventSource::Worker),
            "monitor" => Ok(EventSource::Monitor),
            "system" => Ok(EventSource::System),
            other => Err(OrchdagError::InvalidEventSource(other.to_string())),
        }
    }
}

/// A single immutable event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<GraphId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Optional context attached to an appended event.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub node_id: Option<NodeId>,
    pub graph_id: Option<GraphId>,
    pub correlation_id: Option<String>,
    /// Override the log's default session id for this event.
    pub session_id: Option<SessionId>,
}

impl EventContext {
    pub fn node(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            ..Default::default()
        }
    }

    pub fn graph(graph_id: impl Into<GraphId>) -> Self {
        Self {
            graph_id: Some(graph_id.into()),
            ..Default::default()
        }
    }
}

/// Filters applied when reading the log. All fields are conjunctive;
/// `limit` keeps the last N matches.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub node_id: Option<NodeId>,
    pub graph_id: Option<GraphId>,
    pub session_id: Option<SessionId>,
    pub limit: Option<usize>,
}

impl EventFilter {
    fn matches(&self, event: &Event) -> bool {
        if let Some(t) = self.event_type {
            if event.event_type != t {
                return false;
            }
        }
        if let Some(ref node_id) = self.node_id {
            if event.node_id.as_ref() != Some(node_id) {
                return false;
            }
        }
        if let Some(ref graph_id) = self.graph_id {
            if event.graph_id.as_ref() != Some(graph_id) {
                return false;
            }
        }
        if let Some(ref session_id) = self.session_id {
            if &event.session_id != session_id {
                return false;
            }
        }
        true
    }
}

/// Append-only event log backed by a JSONL file.
///
/// Append order is the only cross-call ordering guarantee in the core.
/// Reads are chronological; individual malformed lines are skipped, never
/// fatal, so a torn write cannot block recovery.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    session_id: SessionId,
}

impl EventLog {
    /// Open (or lazily create) an event log. When `session_id` is `None` a
    /// fresh one is generated.
    pub fn new(path: impl Into<PathBuf>, session_id: Option<SessionId>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.unwrap_or_else(generate_session_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append one event and return its id.
    pub fn append(
        &self,
        event_type: EventType,
        source: EventSource,
        payload: Map<String, Value>,
        ctx: EventContext,
    ) -> Result<String> {
        let event = Event {
            event_id: generate_event_id(),
            event_type,
            timestamp: Utc::now(),
            session_id: ctx.session_id.unwrap_or_else(|| self.session_id.clone()),
            payload,
            source,
            node_id: ctx.node_id,
            graph_id: ctx.graph_id,
            correlation_id: ctx.correlation_id,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{line}")?;

        debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            source = %event.source,
            "event appended"
        );

        Ok(event.event_id)
    }

    /// Read events in append (chronological) order, applying `filter`.
    ///
    /// A missing log file reads as empty. Malformed and blank lines are
    /// skipped.
    pub fn read(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let mut events = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => {
                    if filter.matches(&event) {
                        events.push(event);
                    }
                }
                Err(_) => {
                    // Torn or hand-damaged line; skip it rather than fail
                    // the whole read.
                    continue;
                }
            }
        }

        if let Some(limit) = filter.limit {
            if events.len() > limit {
                events.drain(..events.len() - limit);
            }
        }

        Ok(events)
    }

    /// The most recent event matching `filter`, if any.
    pub fn latest(&self, filter: &EventFilter) -> Result<Option<Event>> {
        let events = self.read(filter)?;
        Ok(events.into_iter().next_back())
    }

    /// All events strictly after the one with `event_id`.
    ///
    /// Returns an empty vector when the id is unknown or is the last
    /// event.
    pub fn since(&self, event_id: &str) -> Result<Vec<Event>> {
        let events = self.read(&EventFilter::default())?;

        match events.iter().position(|e| e.event_id == event_id) {
            Some(idx) => Ok(events.into_iter().skip(idx + 1).collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Wipe the log. Administrative reset only.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Generate a unique event id (`evt_` + 12 hex chars).
fn generate_event_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("evt_{}", &hex[..12])
}
