// src/health/monitor.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{HeartbeatSection, ThresholdSection};
use crate::errors::Result;
use crate::events::{EventContext, EventLog, EventSource, EventType};
use crate::graph::load_graph;
use crate::state::{HeartbeatRecord, StatePatch, StateStore};
use crate::types::{CostTier, NodeId, Role};

/// Liveness thresholds for one cost tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatThresholds {
    /// Expected interval between heartbeats.
    pub interval: Duration,
    /// Elapsed time past which a node counts as stalled.
    pub warning: Duration,
    /// Elapsed time past which a node counts as timed out.
    pub timeout: Duration,
}

impl From<ThresholdSection> for HeartbeatThresholds {
    fn from(section: ThresholdSection) -> Self {
        Self {
            interval: Duration::from_secs(section.interval_secs),
            warning: Duration::from_secs(section.warning_secs),
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }
}

/// Default thresholds per tier. Cheap/background tiers get longer
/// windows; expensive/foreground tiers shorter ones, reflecting expected
/// responsiveness.
pub fn default_thresholds() -> HashMap<CostTier, HeartbeatThresholds> {
    thresholds_from_section(&HeartbeatSection::default())
}

/// Build the per-tier threshold table from validated settings.
pub fn thresholds_from_section(
    section: &HeartbeatSection,
) -> HashMap<CostTier, HeartbeatThresholds> {
    HashMap::from([
        (CostTier::Cheap, section.cheap.into()),
        (CostTier::Medium, section.medium.into()),
        (CostTier::Expensive, section.expensive.into()),
    ])
}

/// Liveness classification of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Stalled,
    TimedOut,
    /// Active but never heartbeated.
    Unknown,
}

/// Health detail for a single node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeHealth {
    pub node_id: NodeId,
    pub status: HealthStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub seconds_since_heartbeat: Option<f64>,
    pub progress: Map<String, Value>,
    pub cost_tier: CostTier,
    pub warning_secs: u64,
    pub timeout_secs: u64,
}

/// Health report across every monitored node.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub healthy: usize,
    pub stalled: usize,
    pub timed_out: usize,
    pub unknown: usize,
    pub nodes: BTreeMap<NodeId, NodeHealth>,
}

impl HealthReport {
    pub fn total(&self) -> usize {
        self.nodes.len()
    }
}

/// Tracks liveness heartbeats per in-flight node and classifies them
/// against tier-specific thresholds.
///
/// Heartbeat records live inside the state snapshot document; stall and
/// timeout detections are reported through the event log. Classification
/// re-runs on every [`HealthMonitor::check`], so callers should
/// rate-limit their checks to avoid flooding the log with repeated
/// detections.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    store: StateStore,
    events: EventLog,
    graph_file: Option<PathBuf>,
    thresholds: HashMap<CostTier, HeartbeatThresholds>,
}

impl HealthMonitor {
    pub fn new(
        store: StateStore,
        events: EventLog,
        graph_file: Option<PathBuf>,
        thresholds: Option<HashMap<CostTier, HeartbeatThresholds>>,
    ) -> Self {
        Self {
            store,
            events,
            graph_file,
            thresholds: thresholds.unwrap_or_else(default_thresholds),
        }
    }

    /// Record a heartbeat for `node_id`, overwriting any previous record,
    /// and append a progress event.
    pub fn heartbeat(&self, node_id: &str, progress: Option<Map<String, Value>>) -> Result<()> {
        let snapshot = self.store.read();
        let mut heartbeats = snapshot.heartbeats;

        let progress = progress.unwrap_or_default();
        heartbeats.insert(
            node_id.to_string(),
            HeartbeatRecord {
                node_id: node_id.to_string(),
                timestamp: Utc::now(),
                progress: progress.clone(),
                status: crate::types::NodeStatus::Running,
            },
        );

        self.store.write(StatePatch {
            heartbeats: Some(heartbeats),
            ..Default::default()
        })?;

        let mut payload = Map::new();
        payload.insert("progress".to_string(), Value::Object(progress));
        self.events.append(
            EventType::WorkerProgress,
            EventSource::Worker,
            payload,
            EventContext::node(node_id),
        )?;

        debug!(node = %node_id, "heartbeat recorded");
        Ok(())
    }

    /// Classify every monitored node against the current time.
    pub fn check(&self) -> Result<HealthReport> {
        self.check_at(Utc::now())
    }

    /// Classify every monitored node against an explicit `now`.
    ///
    /// Every node with a heartbeat record or in the active set is
    /// classified: healthy (elapsed <= warning), stalled (warning <
    /// elapsed <= timeout), timed_out (elapsed > timeout), or unknown
    /// (active but never heartbeated). Crossing into stalled/timed_out is
    /// reported through the event log.
    pub fn check_at(&self, now: DateTime<Utc>) -> Result<HealthReport> {
        let snapshot = self.store.read();
        let heartbeats = snapshot.heartbeats;

        let mut node_ids: BTreeSet<NodeId> = heartbeats.keys().cloned().collect();
        node_ids.extend(snapshot.active_nodes.iter().cloned());

        let mut nodes = BTreeMap::new();
        let mut healthy = 0usize;
        let mut stalled = 0usize;
        let mut timed_out = 0usize;
        let mut unknown = 0usize;

        for node_id in node_ids {
            let tier = self.tier_of(&node_id);
            let thresholds = self.thresholds_for(tier);

            let health = match heartbeats.get(&node_id) {
                None => {
                    unknown += 1;
                    NodeHealth {
                        node_id: node_id.clone(),
                        status: HealthStatus::Unknown,
                        last_heartbeat: None,
                        seconds_since_heartbeat: None,
                        progress: Map::new(),
                        cost_tier: tier,
                        warning_secs: thresholds.warning.as_secs(),
                        timeout_secs: thresholds.timeout.as_secs(),
                    }
                }
                Some(record) => {
                    let elapsed = (now - record.timestamp)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    let status = if elapsed > thresholds.timeout {
                        timed_out += 1;
                        HealthStatus::TimedOut
                    } else if elapsed > thresholds.warning {
                        stalled += 1;
                        HealthStatus::Stalled
                    } else {
                        healthy += 1;
                        HealthStatus::Healthy
                    };

                    NodeHealth {
                        node_id: node_id.clone(),
                        status,
                        last_heartbeat: Some(record.timestamp),
                        seconds_since_heartbeat: Some(elapsed.as_secs_f64()),
                        progress: record.progress.clone(),
                        cost_tier: tier,
                        warning_secs: thresholds.warning.as_secs(),
                        timeout_secs: thresholds.timeout.as_secs(),
                    }
                }
            };

            match health.status {
                HealthStatus::Stalled => {
                    self.report_liveness_fault(EventType::WorkerStalled, &health)?;
                }
                HealthStatus::TimedOut => {
                    self.report_liveness_fault(EventType::WorkerTimeout, &health)?;
                }
                HealthStatus::Healthy | HealthStatus::Unknown => {}
            }

            nodes.insert(node_id, health);
        }

        Ok(HealthReport {
            timestamp: now,
            healthy,
            stalled,
            timed_out,
            unknown,
            nodes,
        })
    }

    /// Node ids currently classified as stalled.
    pub fn stalled_nodes(&self) -> Result<Vec<NodeId>> {
        let report = self.check()?;
        Ok(nodes_with_status(&report, HealthStatus::Stalled))
    }

    /// Node ids currently classified as timed out.
    pub fn timed_out_nodes(&self) -> Result<Vec<NodeId>> {
        let report = self.check()?;
        Ok(nodes_with_status(&report, HealthStatus::TimedOut))
    }

    /// Health detail for one node, if it is monitored.
    pub fn node_health(&self, node_id: &str) -> Result<Option<NodeHealth>> {
        let report = self.check()?;
        Ok(report.nodes.get(node_id).cloned())
    }

    /// Drop the heartbeat record for a node (on completion). Returns
    /// whether a record existed.
    pub fn clear(&self, node_id: &str) -> Result<bool> {
        let snapshot = self.store.read();
        let mut heartbeats = snapshot.heartbeats;

        let existed = heartbeats.remove(node_id).is_some();
        if existed {
            self.store.write(StatePatch {
                heartbeats: Some(heartbeats),
                ..Default::default()
            })?;
        }

        Ok(existed)
    }

    /// Drop every heartbeat record. Returns how many were cleared.
    pub fn clear_all(&self) -> Result<usize> {
        let snapshot = self.store.read();
        let count = snapshot.heartbeats.len();

        self.store.write(StatePatch {
            heartbeats: Some(BTreeMap::new()),
            ..Default::default()
        })?;

        Ok(count)
    }

    fn thresholds_for(&self, tier: CostTier) -> HeartbeatThresholds {
        self.thresholds
            .get(&tier)
            .copied()
            .unwrap_or_else(|| default_thresholds()[&CostTier::Medium])
    }

    /// Resolve a node's cost tier: the graph document's constraints when
    /// a graph file is available, else the node-id role prefix, else
    /// medium.
    fn tier_of(&self, node_id: &str) -> CostTier {
        if let Some(path) = &self.graph_file {
            if let Ok(graph) = load_graph(path) {
                if let Some(node) = graph.node(node_id) {
                    return node.tier();
                }
            }
        }

        if let Some(prefix) = node_id.split('_').next() {
            if let Ok(role) = Role::from_str(prefix) {
                return role.default_tier();
            }
        }

        CostTier::Medium
    }

    fn report_liveness_fault(&self, event_type: EventType, health: &NodeHealth) -> Result<()> {
        warn!(
            node = %health.node_id,
            status = ?health.status,
            seconds_since_heartbeat = ?health.seconds_since_heartbeat,
            "liveness fault detected"
        );

        let mut payload = Map::new();
        if let Some(secs) = health.seconds_since_heartbeat {
            payload.insert("seconds_since_heartbeat".to_string(), secs.into());
        }
        payload.insert("warning_secs".to_string(), health.warning_secs.into());
        payload.insert("timeout_secs".to_string(), health.timeout_secs.into());

        self.events.append(
            event_type,
            EventSource::Monitor,
            payload,
            EventContext::node(health.node_id.clone()),
        )?;

        Ok(())
    }
}

fn nodes_with_status(report: &HealthReport, status: HealthStatus) -> Vec<NodeId> {
    report
        .nodes
        .values()
        .filter(|h| h.status == status)
        .map(|h| h.node_id.clone())
        .collect()
}
