// tests/resume_flow.rs

//! Crash-recovery integration: a run is interrupted with nodes in
//! flight, the state store hands them back as "interrupted", and the
//! caller resets them to pending before re-deriving readiness.

use orchdag::graph::Scheduler;
use orchdag::state::{RunStatus, StateStore};
use orchdag::types::{EdgeCondition, NodeStatus, Role, Track};
use orchdag_test_utils::builders::{instantiate, NodeBuilder, TemplateBuilder};
use orchdag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn interrupted_nodes_are_reset_and_rederived_as_ready() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let store = StateStore::new(dir.path().join("state.json"));
    let scheduler = Scheduler::new("templates");

    let template = TemplateBuilder::new(Track::Feature)
        .with_node(NodeBuilder::new("x", Role::Scout).build())
        .with_node(NodeBuilder::new("y", Role::Analyst).build())
        .with_node(NodeBuilder::new("z", Role::Builder).build())
        .with_edge("x", "z", EdgeCondition::OnSuccess)
        .with_edge("y", "z", EdgeCondition::OnSuccess)
        .build();
    let mut graph = instantiate(&template, "interrupted run");

    // The run gets underway: x and y are dispatched and recorded as
    // active in both documents.
    store.start_graph(&graph.id, "sess_resume")?;
    scheduler.mark_status(&mut graph, "x", NodeStatus::Running, None, None)?;
    scheduler.mark_status(&mut graph, "y", NodeStatus::Running, None, None)?;
    store.activate_node("x")?;
    store.activate_node("y")?;
    orchdag::graph::save_graph(&dir.path().join("taskgraph.json"), &graph)?;

    // ...crash. A new process reloads both documents.
    let mut graph = orchdag::graph::load_graph(&dir.path().join("taskgraph.json"))?;

    assert_eq!(
        store.interrupted_nodes(),
        vec!["x".to_string(), "y".to_string()]
    );

    let plan = store.prepare_for_resume()?;
    assert_eq!(plan.resumed_nodes, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(store.read().status, RunStatus::Running);
    assert!(store.read().active_nodes.is_empty());

    // "Active" meant "interrupted, needs re-admission", not "still
    // running". Reset the interrupted nodes before re-deriving readiness.
    scheduler.reset_interrupted(&mut graph, &plan.resumed_nodes);
    assert_eq!(
        graph.node("x").expect("x").status,
        NodeStatus::Pending
    );
    assert_eq!(
        graph.node("y").expect("y").status,
        NodeStatus::Pending
    );
    assert!(graph.execution.active_nodes.is_empty());

    let ready: Vec<_> = scheduler
        .ready_nodes(&graph)
        .iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(ready, vec!["x".to_string(), "y".to_string()]);

    Ok(())
}

#[test]
fn completed_work_survives_the_interruption() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = StateStore::new(dir.path().join("state.json"));
    let scheduler = Scheduler::new("templates");

    let template = TemplateBuilder::new(Track::Fix)
        .with_node(NodeBuilder::new("x", Role::Scout).build())
        .with_node(NodeBuilder::new("z", Role::Builder).build())
        .with_edge("x", "z", EdgeCondition::OnSuccess)
        .build();
    let mut graph = instantiate(&template, "partial progress");

    store.start_graph(&graph.id, "sess_resume")?;
    scheduler.mark_status(&mut graph, "x", NodeStatus::Done, None, None)?;
    store.complete_node("x")?;
    scheduler.mark_status(&mut graph, "z", NodeStatus::Running, None, None)?;
    store.activate_node("z")?;

    let plan = store.prepare_for_resume()?;
    assert_eq!(plan.resumed_nodes, vec!["z".to_string()]);

    scheduler.reset_interrupted(&mut graph, &plan.resumed_nodes);

    // x stays done; z is pending again and immediately ready since its
    // dependency is already satisfied.
    assert_eq!(graph.node("x").expect("x").status, NodeStatus::Done);
    let ready: Vec<_> = scheduler
        .ready_nodes(&graph)
        .iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(ready, vec!["z".to_string()]);

    // Completed bookkeeping survived in the snapshot too.
    assert_eq!(store.read().completed_nodes, vec!["x".to_string()]);

    Ok(())
}
