// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, warn};

use crate::admission::{ActiveByTier, AdmissionController, TerritoryClaim};
use crate::engine::{DispatchedNode, NodeOutcome, RuntimeOptions};
use crate::graph::{Scheduler, TaskGraph};
use crate::types::{NodeId, NodeStatus};

/// Command produced by the pure core, to be executed by the outer IO
/// shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these nodes to the worker backend.
    DispatchNodes(Vec<DispatchedNode>),
    /// Request that the runtime loop exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn noop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Handle a graph trigger: re-derive readiness and dispatch whatever
/// admission control allows.
pub fn handle_graph_trigger(
    scheduler: &Scheduler,
    graph: &mut TaskGraph,
    admission: &mut AdmissionController,
    options: &RuntimeOptions,
) -> CoreStep {
    let mut commands = dispatch_ready(scheduler, graph, admission);
    let keep_running = evaluate_idle_exit(graph, options, &mut commands);

    CoreStep {
        commands,
        keep_running,
    }
}

/// Handle a node termination reported by the executor.
///
/// The node's status and payload are recorded, its territories released,
/// and newly unblocked work dispatched.
pub fn handle_node_termination(
    scheduler: &Scheduler,
    graph: &mut TaskGraph,
    admission: &mut AdmissionController,
    options: &RuntimeOptions,
    node: &str,
    outcome: NodeOutcome,
) -> CoreStep {
    let marked = match outcome {
        NodeOutcome::Completed { outputs } => {
            scheduler.mark_status(graph, node, NodeStatus::Done, Some(outputs), None)
        }
        NodeOutcome::Failed { error } => {
            scheduler.mark_status(graph, node, NodeStatus::Failed, None, Some(error))
        }
    };

    if let Err(e) = marked {
        warn!(node = %node, error = %e, "termination for unmarkable node; ignoring");
        return CoreStep::noop();
    }

    admission.release(node);

    let mut commands = dispatch_ready(scheduler, graph, admission);
    let keep_running = evaluate_idle_exit(graph, options, &mut commands);

    CoreStep {
        commands,
        keep_running,
    }
}

/// Compute the ready set, admit a batch within tier ceilings, claim
/// territories, mark admitted nodes running and emit a dispatch command.
///
/// A node whose territory claim conflicts is deferred, not failed: it
/// stays pending and is reconsidered on a later step once the holder
/// releases.
pub fn dispatch_ready(
    scheduler: &Scheduler,
    graph: &mut TaskGraph,
    admission: &mut AdmissionController,
) -> Vec<CoreCommand> {
    struct Candidate {
        node_id: NodeId,
        territories: Vec<TerritoryClaim>,
        dispatch: DispatchedNode,
    }

    let candidates: Vec<Candidate> = {
        let active = ActiveByTier::from_graph(graph);
        let ready = scheduler.ready_nodes(graph);
        admission
            .next_batch(&ready, &active)
            .into_iter()
            .map(|node| Candidate {
                node_id: node.id.clone(),
                territories: node.territories.clone(),
                dispatch: DispatchedNode {
                    node_id: node.id.clone(),
                    graph_id: graph.id.clone(),
                    role: node.role,
                    title: node.title.clone(),
                    tier: node.tier(),
                    background: node.constraints.background,
                },
            })
            .collect()
    };

    let mut dispatched = Vec::new();

    for candidate in candidates {
        let conflicts = admission.claim(&candidate.node_id, &candidate.territories);
        if !conflicts.is_empty() {
            debug!(
                node = %candidate.node_id,
                ?conflicts,
                "territory conflict; deferring node to a later step"
            );
            continue;
        }

        if let Err(e) = scheduler.mark_status(
            graph,
            &candidate.node_id,
            NodeStatus::Running,
            None,
            None,
        ) {
            // The candidate came from this graph, so this only fires on a
            // hand-damaged document.
            warn!(node = %candidate.node_id, error = %e, "could not mark admitted node running");
            admission.release(&candidate.node_id);
            continue;
        }

        dispatched.push(candidate.dispatch);
    }

    if dispatched.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchNodes(dispatched)]
    }
}

/// Resolve whether the loop should exit: nothing running, nothing newly
/// dispatched, and `exit_when_idle` set. Covers both completion and the
/// blocked-on-failure case, where only an explicit retry can make
/// progress.
fn evaluate_idle_exit(
    graph: &TaskGraph,
    options: &RuntimeOptions,
    commands: &mut Vec<CoreCommand>,
) -> bool {
    if !options.exit_when_idle {
        return true;
    }

    if graph.execution.active_nodes.is_empty() {
        commands.push(CoreCommand::RequestExit);
        return false;
    }

    true
}

/// Mark a failed node pending again (explicit retry) and dispatch it if
/// admission allows.
pub fn handle_node_retry(
    scheduler: &Scheduler,
    graph: &mut TaskGraph,
    admission: &mut AdmissionController,
    node: &str,
) -> CoreStep {
    match scheduler.retry_node(graph, node) {
        Ok(count) => {
            debug!(node = %node, retry_count = count, "node reset for retry");
        }
        Err(e) => {
            warn!(node = %node, error = %e, "retry rejected");
            return CoreStep::noop();
        }
    }

    let commands = dispatch_ready(scheduler, graph, admission);
    CoreStep {
        commands,
        keep_running: true,
    }
}
