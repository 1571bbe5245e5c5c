// tests/state_store.rs

use std::fs;

use orchdag::errors::OrchdagError;
use orchdag::state::{RunStatus, StatePatch, StateSnapshot, StateStore};
use orchdag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn store_in(dir: &tempfile::TempDir) -> StateStore {
    StateStore::new(dir.path().join("state.json"))
}

#[test]
fn read_returns_idle_default_when_missing() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    let snapshot = store.read();
    assert_eq!(snapshot, StateSnapshot::default());
    assert_eq!(snapshot.status, RunStatus::Idle);
    assert!(snapshot.current_graph_id.is_none());

    Ok(())
}

#[test]
fn read_returns_idle_default_when_corrupt() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    fs::write(store.path(), "{ not valid json")?;

    // Corruption never raises.
    let snapshot = store.read();
    assert_eq!(snapshot.status, RunStatus::Idle);

    Ok(())
}

#[test]
fn write_merges_fields_and_round_trips() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    let written = store.write(StatePatch {
        current_graph_id: Some("tg_abc".to_string()),
        status: Some(RunStatus::Running),
        active_nodes: Some(vec!["a".to_string()]),
        ..Default::default()
    })?;
    assert!(written.updated_at.is_some());

    // A later partial write must not clobber unrelated fields.
    store.write(StatePatch {
        current_phase: Some(2),
        ..Default::default()
    })?;

    let read_back = store.read();
    assert_eq!(read_back.current_graph_id.as_deref(), Some("tg_abc"));
    assert_eq!(read_back.status, RunStatus::Running);
    assert_eq!(read_back.active_nodes, vec!["a".to_string()]);
    assert_eq!(read_back.current_phase, 2);

    Ok(())
}

#[test]
fn crash_between_temp_write_and_rename_keeps_previous_snapshot() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.write(StatePatch {
        current_graph_id: Some("tg_before".to_string()),
        status: Some(RunStatus::Running),
        ..Default::default()
    })?;

    // Simulate a crash mid-write: a half-written temp file next to the
    // snapshot, with the rename never having happened.
    fs::write(dir.path().join("state_partial.json.tmp"), "{\"current_gra")?;

    let snapshot = store.read();
    assert_eq!(snapshot.current_graph_id.as_deref(), Some("tg_before"));
    assert_eq!(snapshot.status, RunStatus::Running);

    Ok(())
}

#[test]
fn activate_and_complete_are_idempotent() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.activate_node("x")?;
    store.activate_node("x")?;
    assert_eq!(store.read().active_nodes, vec!["x".to_string()]);

    store.complete_node("x")?;
    store.complete_node("x")?;
    let snapshot = store.read();
    assert!(snapshot.active_nodes.is_empty());
    assert_eq!(snapshot.completed_nodes, vec!["x".to_string()]);

    Ok(())
}

#[test]
fn fail_node_moves_from_active_to_failed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.activate_node("x")?;
    store.fail_node("x")?;

    let snapshot = store.read();
    assert!(snapshot.active_nodes.is_empty());
    assert_eq!(snapshot.failed_nodes, vec!["x".to_string()]);

    Ok(())
}

#[test]
fn record_retry_increments_count_and_clears_failed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.fail_node("x")?;
    store.record_retry("x")?;

    let snapshot = store.read();
    assert!(snapshot.failed_nodes.is_empty());
    assert_eq!(store.retry_count("x"), 1);

    store.record_retry("x")?;
    assert_eq!(store.retry_count("x"), 2);
    assert_eq!(store.retry_count("never_failed"), 0);

    Ok(())
}

#[test]
fn graph_lifecycle_operations() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.start_graph("tg_1", "sess_1")?;
    let snapshot = store.read();
    assert_eq!(snapshot.status, RunStatus::Running);
    assert_eq!(snapshot.current_phase, 0);
    assert_eq!(snapshot.session_id.as_deref(), Some("sess_1"));

    store.advance_phase()?;
    assert_eq!(store.read().current_phase, 1);

    store.pause_graph()?;
    assert_eq!(store.read().status, RunStatus::Paused);

    store.abort_graph(Some("operator gave up"))?;
    let snapshot = store.read();
    assert_eq!(snapshot.status, RunStatus::Aborted);
    assert_eq!(snapshot.abort_reason.as_deref(), Some("operator gave up"));
    assert!(snapshot.active_nodes.is_empty());

    Ok(())
}

#[test]
fn prepare_for_resume_requires_an_active_graph() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    let err = store.prepare_for_resume().unwrap_err();
    assert!(matches!(err, OrchdagError::NoActiveGraph));

    Ok(())
}

#[test]
fn prepare_for_resume_rejects_completed_graph() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.start_graph("tg_1", "sess_1")?;
    store.complete_graph()?;

    let err = store.prepare_for_resume().unwrap_err();
    assert!(matches!(err, OrchdagError::AlreadyCompleted));

    Ok(())
}

#[test]
fn prepare_for_resume_rejects_running_with_no_interrupted_nodes() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.start_graph("tg_1", "sess_1")?;

    let err = store.prepare_for_resume().unwrap_err();
    assert!(matches!(err, OrchdagError::NothingToResume));

    Ok(())
}

#[test]
fn prepare_for_resume_returns_interrupted_and_clears_active() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.start_graph("tg_1", "sess_1")?;
    store.activate_node("x")?;
    store.activate_node("y")?;

    let plan = store.prepare_for_resume()?;
    assert_eq!(plan.graph_id, "tg_1");
    assert_eq!(plan.resumed_nodes, vec!["x".to_string(), "y".to_string()]);

    let snapshot = store.read();
    assert_eq!(snapshot.status, RunStatus::Running);
    assert!(snapshot.active_nodes.is_empty());

    Ok(())
}

#[test]
fn reset_returns_to_idle_default() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = store_in(&dir);

    store.start_graph("tg_1", "sess_1")?;
    store.reset()?;

    let snapshot = store.read();
    assert_eq!(snapshot.status, RunStatus::Idle);
    assert!(snapshot.current_graph_id.is_none());

    Ok(())
}
