// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::events::{EventContext, EventLog, EventSource, EventType};
use crate::exec::WorkerBackend;
use crate::graph::save_graph;
use crate::health::HealthMonitor;
use crate::state::StateStore;
use crate::types::GraphStatus;

use super::core::CoreRuntime;
use super::{CoreCommand, DispatchedNode, NodeOutcome, RuntimeEvent};

/// Drives the core runtime in response to `RuntimeEvent`s and performs
/// all IO around it: persisting the state snapshot and graph document,
/// appending events, routing heartbeats to the health monitor, and
/// handing dispatches to a [`WorkerBackend`].
///
/// This is a pure IO shell around [`CoreRuntime`], which contains all the
/// scheduling semantics.
pub struct Runtime<B: WorkerBackend> {
    core: CoreRuntime,
    store: StateStore,
    events: EventLog,
    monitor: HealthMonitor,
    graph_file: PathBuf,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
}

impl<B: WorkerBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: WorkerBackend> Runtime<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: CoreRuntime,
        store: StateStore,
        events: EventLog,
        monitor: HealthMonitor,
        graph_file: PathBuf,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
    ) -> Self {
        Self {
            core,
            store,
            events,
            monitor,
            graph_file,
            event_rx,
            backend,
        }
    }

    pub fn core(&self) -> &CoreRuntime {
        &self.core
    }

    /// Record the start of this graph's execution: state snapshot, graph
    /// document and a `GraphCreated` event. Call once before [`run`].
    ///
    /// [`run`]: Runtime::run
    pub async fn start(&mut self) -> Result<()> {
        let graph_id = self.core.graph().id.clone();
        let session_id = self.events.session_id().to_string();

        self.store.start_graph(&graph_id, &session_id)?;
        save_graph(&self.graph_file, self.core.graph())?;

        let mut payload = Map::new();
        payload.insert(
            "track".to_string(),
            Value::String(self.core.graph().track.to_string()),
        );
        payload.insert(
            "title".to_string(),
            Value::String(self.core.graph().title.clone()),
        );
        self.events.append(
            EventType::GraphCreated,
            EventSource::Scheduler,
            payload,
            EventContext::graph(graph_id),
        )?;

        Ok(())
    }

    /// Resume an interrupted execution.
    ///
    /// Applies `prepare_for_resume` to the state snapshot, resets the
    /// interrupted nodes back to pending in the graph so their readiness
    /// is recomputed (they are not assumed still in flight), and appends
    /// a `GraphResumed` event. The actual re-dispatch happens on the next
    /// `GraphTriggered` step.
    pub async fn resume(&mut self) -> Result<Vec<String>> {
        let plan = self.store.prepare_for_resume()?;

        let resumed = plan.resumed_nodes.clone();
        {
            let core = &mut self.core;
            let scheduler = core.scheduler().clone();
            scheduler.reset_interrupted(core.graph_mut(), &resumed);
        }
        save_graph(&self.graph_file, self.core.graph())?;

        let mut payload = Map::new();
        payload.insert(
            "resumed_nodes".to_string(),
            Value::Array(resumed.iter().cloned().map(Value::String).collect()),
        );
        self.events.append(
            EventType::GraphResumed,
            EventSource::System,
            payload,
            EventContext::graph(plan.graph_id),
        )?;

        info!(resumed = resumed.len(), "graph prepared for resume");
        Ok(resumed)
    }

    /// Explicitly retry a failed node, then dispatch whatever became
    /// admissible. This is the embedding process's recovery lever; the
    /// executor never requests retries itself.
    pub async fn retry(&mut self, node: &str) -> Result<()> {
        {
            let scheduler = self.core.scheduler().clone();
            scheduler.retry_node(self.core.graph_mut(), node)?;
        }

        self.store.record_retry(node)?;
        self.events.append(
            EventType::NodeRetried,
            EventSource::System,
            Map::new(),
            EventContext::node(node),
        )?;

        let step = self.core.step(RuntimeEvent::GraphTriggered);
        self.execute_step_commands(step.commands).await?;
        save_graph(&self.graph_file, self.core.graph())?;
        Ok(())
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from the channel.
    /// - Routes heartbeats to the health monitor.
    /// - Feeds everything else into the pure core and executes the
    ///   commands it returns.
    pub async fn run(mut self) -> Result<()> {
        info!(graph_id = %self.core.graph().id, "orchdag runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let keep_running = self.handle_event(event).await?;
            if !keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn handle_event(&mut self, event: RuntimeEvent) -> Result<bool> {
        if let RuntimeEvent::NodeHeartbeat { node, progress } = event {
            // Liveness only; no scheduling decision to make.
            self.monitor.heartbeat(&node, progress)?;
            return Ok(true);
        }

        // Persist the reported transition before stepping the core, so a
        // crash mid-step leaves the snapshot at worst slightly ahead of
        // the graph document (resume tolerates that).
        if let RuntimeEvent::NodeTerminated { node, outcome } = &event {
            self.record_termination(node, outcome)?;
        }

        let step = self.core.step(event);
        self.execute_step_commands(step.commands).await?;
        save_graph(&self.graph_file, self.core.graph())?;
        self.finalize_graph_status()?;

        Ok(step.keep_running)
    }

    fn record_termination(&mut self, node: &str, outcome: &NodeOutcome) -> Result<()> {
        match outcome {
            NodeOutcome::Completed { outputs } => {
                self.store.complete_node(node)?;
                let mut payload = Map::new();
                payload.insert("outputs".to_string(), Value::Object(outputs.clone()));
                self.events.append(
                    EventType::NodeCompleted,
                    EventSource::Worker,
                    payload,
                    EventContext::node(node),
                )?;
            }
            NodeOutcome::Failed { error } => {
                self.store.fail_node(node)?;
                let mut payload = Map::new();
                payload.insert("error".to_string(), error.clone());
                self.events.append(
                    EventType::NodeFailed,
                    EventSource::Worker,
                    payload,
                    EventContext::node(node),
                )?;
            }
        }

        self.monitor.clear(node)?;
        Ok(())
    }

    async fn execute_step_commands(&mut self, commands: Vec<CoreCommand>) -> Result<()> {
        for command in commands {
            match command {
                CoreCommand::DispatchNodes(nodes) => {
                    self.dispatch(nodes).await?;
                }
                CoreCommand::RequestExit => {
                    debug!("core issued RequestExit command");
                }
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, nodes: Vec<DispatchedNode>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        for node in &nodes {
            self.store.activate_node(&node.node_id)?;

            let mut payload = Map::new();
            payload.insert("role".to_string(), Value::String(node.role.to_string()));
            payload.insert("tier".to_string(), Value::String(node.tier.to_string()));
            self.events.append(
                EventType::NodeScheduled,
                EventSource::Scheduler,
                payload,
                EventContext {
                    node_id: Some(node.node_id.clone()),
                    graph_id: Some(node.graph_id.clone()),
                    ..Default::default()
                },
            )?;
        }

        let ids: Vec<_> = nodes.iter().map(|n| n.node_id.as_str()).collect();
        debug!(?ids, "dispatching admitted nodes");

        self.backend.dispatch(nodes).await
    }

    /// Mirror a terminal graph status into the state snapshot and event
    /// log, exactly once.
    fn finalize_graph_status(&mut self) -> Result<()> {
        let status = self.core.graph().status;
        let graph_id = self.core.graph().id.clone();

        match status {
            GraphStatus::Completed => {
                let snapshot = self.store.read();
                if snapshot.status != crate::state::RunStatus::Completed {
                    self.store.complete_graph()?;
                    self.monitor.clear_all()?;
                    self.events.append(
                        EventType::GraphCompleted,
                        EventSource::Scheduler,
                        Map::new(),
                        EventContext::graph(graph_id),
                    )?;
                }
            }
            GraphStatus::Aborted => {
                // Blocked on failures: recovery (retry or abort) is the
                // embedding process's decision, so only surface it.
                warn!(graph_id = %graph_id, "graph is blocked on failed nodes");
            }
            _ => {}
        }

        Ok(())
    }
}
