// tests/engine_core.rs

//! Pure core runtime tests: no Tokio, no channels, no filesystem.

use orchdag::admission::{AdmissionController, TierLimits};
use orchdag::engine::{CoreCommand, CoreRuntime, NodeOutcome, RuntimeEvent, RuntimeOptions};
use orchdag::graph::Scheduler;
use orchdag::types::{EdgeCondition, GraphStatus, NodeStatus, Role, Track};
use orchdag_test_utils::builders::{instantiate, NodeBuilder, TemplateBuilder};
use orchdag_test_utils::init_tracing;

fn core_for(template: &orchdag::TrackTemplate, exit_when_idle: bool) -> CoreRuntime {
    let scheduler = Scheduler::new("templates");
    let graph = instantiate(template, "core test");
    CoreRuntime::new(
        scheduler,
        graph,
        AdmissionController::new(TierLimits::default()),
        RuntimeOptions { exit_when_idle },
    )
}

fn dispatched_ids(commands: &[CoreCommand]) -> Vec<String> {
    commands
        .iter()
        .flat_map(|c| match c {
            CoreCommand::DispatchNodes(nodes) => {
                nodes.iter().map(|n| n.node_id.clone()).collect::<Vec<_>>()
            }
            CoreCommand::RequestExit => Vec::new(),
        })
        .collect()
}

#[test]
fn trigger_dispatches_roots_and_termination_unblocks_dependents() {
    init_tracing();
    let template = TemplateBuilder::new(Track::Fix)
        .with_node(NodeBuilder::new("a", Role::Scout).build())
        .with_node(NodeBuilder::new("b", Role::Builder).build())
        .with_edge("a", "b", EdgeCondition::OnSuccess)
        .build();
    let mut core = core_for(&template, true);

    let step = core.step(RuntimeEvent::GraphTriggered);
    assert_eq!(dispatched_ids(&step.commands), vec!["a".to_string()]);
    assert!(step.keep_running);
    assert_eq!(
        core.graph().node("a").expect("a").status,
        NodeStatus::Running
    );

    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "a".to_string(),
        outcome: NodeOutcome::Completed {
            outputs: serde_json::Map::new(),
        },
    });
    assert_eq!(dispatched_ids(&step.commands), vec!["b".to_string()]);
    assert!(step.keep_running);

    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "b".to_string(),
        outcome: NodeOutcome::Completed {
            outputs: serde_json::Map::new(),
        },
    });
    assert!(dispatched_ids(&step.commands).is_empty());
    assert!(!step.keep_running);
    assert!(core.is_complete());
    assert_eq!(core.graph().status, GraphStatus::Completed);
}

#[test]
fn territory_conflicts_defer_one_of_two_ready_nodes() {
    let template = TemplateBuilder::new(Track::Direct)
        .with_node(
            NodeBuilder::new("writer_1", Role::Scout)
                .territory("shared.rs")
                .build(),
        )
        .with_node(
            NodeBuilder::new("writer_2", Role::Scout)
                .territory("shared.rs")
                .build(),
        )
        .build();
    let mut core = core_for(&template, false);

    // Both are ready and within the cheap ceiling, but they contend for
    // the same territory: only the first starts.
    let step = core.step(RuntimeEvent::GraphTriggered);
    assert_eq!(dispatched_ids(&step.commands), vec!["writer_1".to_string()]);
    assert_eq!(
        core.graph().node("writer_2").expect("writer_2").status,
        NodeStatus::Pending
    );
    assert_eq!(core.admission().held_territories().count(), 1);

    // Termination releases the territory; the deferred node starts.
    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "writer_1".to_string(),
        outcome: NodeOutcome::Completed {
            outputs: serde_json::Map::new(),
        },
    });
    assert_eq!(dispatched_ids(&step.commands), vec!["writer_2".to_string()]);
}

#[test]
fn failure_blocks_dependents_and_retry_recovers() {
    let template = TemplateBuilder::new(Track::Fix)
        .with_node(NodeBuilder::new("a", Role::Scout).build())
        .with_node(NodeBuilder::new("b", Role::Builder).build())
        .with_edge("a", "b", EdgeCondition::OnSuccess)
        .build();
    let mut core = core_for(&template, false);

    core.step(RuntimeEvent::GraphTriggered);
    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "a".to_string(),
        outcome: NodeOutcome::Failed {
            error: serde_json::json!({ "message": "boom" }),
        },
    });

    // Nothing can progress: b's on_success edge is unsatisfiable until a
    // retry, and the graph reports itself blocked.
    assert!(dispatched_ids(&step.commands).is_empty());
    assert_eq!(core.graph().status, GraphStatus::Aborted);

    // Explicit retry resets a and dispatches it again.
    let step = core.step_retry("a");
    assert_eq!(dispatched_ids(&step.commands), vec!["a".to_string()]);
    assert_eq!(
        core.graph().node("a").expect("a").constraints.retry_count,
        1
    );

    // Retrying a node that is not failed does nothing.
    let step = core.step_retry("b");
    assert!(dispatched_ids(&step.commands).is_empty());
}

#[test]
fn heartbeats_are_not_a_scheduling_decision() {
    let template = TemplateBuilder::new(Track::Direct)
        .with_node(NodeBuilder::new("solo", Role::Scout).build())
        .build();
    let mut core = core_for(&template, false);

    let step = core.step(RuntimeEvent::NodeHeartbeat {
        node: "solo".to_string(),
        progress: None,
    });
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
}

#[test]
fn shutdown_stops_the_loop() {
    let template = TemplateBuilder::new(Track::Direct)
        .with_node(NodeBuilder::new("solo", Role::Scout).build())
        .build();
    let mut core = core_for(&template, false);

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
}

#[test]
fn exit_when_idle_fires_on_blocked_graphs_too() {
    let template = TemplateBuilder::new(Track::Fix)
        .with_node(NodeBuilder::new("a", Role::Scout).build())
        .with_node(NodeBuilder::new("b", Role::Builder).build())
        .with_edge("a", "b", EdgeCondition::OnSuccess)
        .build();
    let mut core = core_for(&template, true);

    core.step(RuntimeEvent::GraphTriggered);
    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "a".to_string(),
        outcome: NodeOutcome::Failed {
            error: serde_json::json!({ "message": "boom" }),
        },
    });

    // Nothing running, nothing dispatchable: the loop should end rather
    // than wait forever for a retry decision.
    assert!(!step.keep_running);
    assert!(step
        .commands
        .iter()
        .any(|c| matches!(c, CoreCommand::RequestExit)));
}

#[test]
fn tier_ceiling_holds_across_steps() {
    let template = TemplateBuilder::new(Track::Direct)
        .with_node(NodeBuilder::new("build_1", Role::Builder).build())
        .with_node(NodeBuilder::new("build_2", Role::Builder).build())
        .build();
    let mut core = core_for(&template, false);

    // Expensive ceiling is 1: the second builder waits.
    let step = core.step(RuntimeEvent::GraphTriggered);
    assert_eq!(dispatched_ids(&step.commands), vec!["build_1".to_string()]);

    // Re-triggering while build_1 runs does not over-admit.
    let step = core.step(RuntimeEvent::GraphTriggered);
    assert!(dispatched_ids(&step.commands).is_empty());

    let step = core.step(RuntimeEvent::NodeTerminated {
        node: "build_1".to_string(),
        outcome: NodeOutcome::Completed {
            outputs: serde_json::Map::new(),
        },
    });
    assert_eq!(dispatched_ids(&step.commands), vec!["build_2".to_string()]);
}
