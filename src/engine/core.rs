// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`RuntimeEvent`]s and produces:
//! - an updated task graph + admission state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible
//! for channels, persistence, the event log and the health monitor. The
//! core is intended to be extensively unit tested without any Tokio,
//! channels or filesystem.

use crate::admission::AdmissionController;
use crate::engine::event_handlers::{
    handle_graph_trigger, handle_node_retry, handle_node_termination, CoreStep,
};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::graph::{Scheduler, TaskGraph};

/// Pure core runtime state.
///
/// This owns:
/// - the task graph scheduler and the active graph document
/// - the admission controller (tier ceilings + territory claims)
/// - runtime options (e.g. `exit_when_idle`)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    graph: TaskGraph,
    admission: AdmissionController,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        graph: TaskGraph,
        admission: AdmissionController,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            graph,
            admission,
            options,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TaskGraph {
        &mut self.graph
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Whether every node in the graph is terminal.
    pub fn is_complete(&self) -> bool {
        self.scheduler.is_complete(&self.graph)
    }

    /// Handle a single runtime event, updating core state and returning
    /// the resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::GraphTriggered => handle_graph_trigger(
                &self.scheduler,
                &mut self.graph,
                &mut self.admission,
                &self.options,
            ),
            RuntimeEvent::NodeTerminated { node, outcome } => handle_node_termination(
                &self.scheduler,
                &mut self.graph,
                &mut self.admission,
                &self.options,
                &node,
                outcome,
            ),
            // Heartbeats carry no scheduling decision; the IO shell routes
            // them to the health monitor.
            RuntimeEvent::NodeHeartbeat { .. } => CoreStep::noop(),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// Explicit retry of a failed node (a recovery decision made by the
    /// embedding process, not an event from the executor).
    pub fn step_retry(&mut self, node: &str) -> CoreStep {
        handle_node_retry(&self.scheduler, &mut self.graph, &mut self.admission, node)
    }
}
