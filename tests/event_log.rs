// tests/event_log.rs

use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

use orchdag::events::{EventContext, EventFilter, EventLog, EventSource, EventType};
use orchdag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn payload(key: &str, value: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    map
}

#[test]
fn append_then_read_is_chronological() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), Some("sess_test".into()));

    let first = log.append(
        EventType::GraphCreated,
        EventSource::Scheduler,
        payload("title", "first"),
        EventContext::graph("tg_1"),
    )?;
    let second = log.append(
        EventType::NodeScheduled,
        EventSource::Scheduler,
        payload("role", "scout"),
        EventContext::node("scout_1"),
    )?;

    let events = log.read(&EventFilter::default())?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, first);
    assert_eq!(events[1].event_id, second);
    assert!(first.starts_with("evt_"));
    assert_eq!(events[0].session_id, "sess_test");
    assert_eq!(events[0].graph_id.as_deref(), Some("tg_1"));
    assert_eq!(events[1].node_id.as_deref(), Some("scout_1"));

    Ok(())
}

#[test]
fn read_applies_filters_conjunctively() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), None);

    log.append(
        EventType::NodeCompleted,
        EventSource::Worker,
        Default::default(),
        EventContext::node("a"),
    )?;
    log.append(
        EventType::NodeCompleted,
        EventSource::Worker,
        Default::default(),
        EventContext::node("b"),
    )?;
    log.append(
        EventType::NodeFailed,
        EventSource::Worker,
        Default::default(),
        EventContext::node("a"),
    )?;

    let completed_a = log.read(&EventFilter {
        event_type: Some(EventType::NodeCompleted),
        node_id: Some("a".to_string()),
        ..Default::default()
    })?;
    assert_eq!(completed_a.len(), 1);
    assert_eq!(completed_a[0].node_id.as_deref(), Some("a"));

    Ok(())
}

#[test]
fn limit_keeps_the_last_n_matches() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), None);

    for i in 0..5 {
        log.append(
            EventType::WorkerProgress,
            EventSource::Worker,
            payload("step", &i.to_string()),
            EventContext::node("a"),
        )?;
    }

    let last_two = log.read(&EventFilter {
        limit: Some(2),
        ..Default::default()
    })?;
    assert_eq!(last_two.len(), 2);
    assert_eq!(last_two[0].payload["step"], "3");
    assert_eq!(last_two[1].payload["step"], "4");

    Ok(())
}

#[test]
fn malformed_lines_are_skipped_not_fatal() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.jsonl");
    let log = EventLog::new(&path, None);
    assert_eq!(log.path(), path);

    log.append(
        EventType::GraphCreated,
        EventSource::Scheduler,
        Default::default(),
        EventContext::default(),
    )?;

    // Simulate a torn write between two valid records.
    let mut file = OpenOptions::new().append(true).open(&path)?;
    writeln!(file, "{{\"event_id\": \"evt_torn")?;
    writeln!(file)?;
    drop(file);

    log.append(
        EventType::GraphCompleted,
        EventSource::Scheduler,
        Default::default(),
        EventContext::default(),
    )?;

    let events = log.read(&EventFilter::default())?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::GraphCreated);
    assert_eq!(events[1].event_type, EventType::GraphCompleted);

    Ok(())
}

#[test]
fn latest_returns_most_recent_match() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), None);

    assert!(log.latest(&EventFilter::default())?.is_none());

    log.append(
        EventType::WorkerProgress,
        EventSource::Worker,
        payload("step", "1"),
        EventContext::node("a"),
    )?;
    log.append(
        EventType::WorkerProgress,
        EventSource::Worker,
        payload("step", "2"),
        EventContext::node("a"),
    )?;

    let latest = log
        .latest(&EventFilter {
            event_type: Some(EventType::WorkerProgress),
            ..Default::default()
        })?
        .expect("expected a latest event");
    assert_eq!(latest.payload["step"], "2");

    Ok(())
}

#[test]
fn since_returns_events_after_the_given_id() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), None);

    let first = log.append(
        EventType::GraphCreated,
        EventSource::Scheduler,
        Default::default(),
        EventContext::default(),
    )?;
    let second = log.append(
        EventType::NodeScheduled,
        EventSource::Scheduler,
        Default::default(),
        EventContext::default(),
    )?;
    let third = log.append(
        EventType::NodeCompleted,
        EventSource::Worker,
        Default::default(),
        EventContext::default(),
    )?;

    let after_first = log.since(&first)?;
    assert_eq!(after_first.len(), 2);
    assert_eq!(after_first[0].event_id, second);
    assert_eq!(after_first[1].event_id, third);

    assert!(log.since(&third)?.is_empty());
    assert!(log.since("evt_unknown")?.is_empty());

    Ok(())
}

#[test]
fn clear_wipes_the_log() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("events.jsonl"), None);

    log.append(
        EventType::GraphCreated,
        EventSource::Scheduler,
        Default::default(),
        EventContext::default(),
    )?;
    log.clear()?;

    assert!(log.read(&EventFilter::default())?.is_empty());
    // Clearing an already-empty log is fine.
    log.clear()?;

    Ok(())
}

#[test]
fn missing_file_reads_as_empty() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = EventLog::new(dir.path().join("never_written.jsonl"), None);
    assert!(log.read(&EventFilter::default())?.is_empty());
    Ok(())
}

#[test]
fn unknown_type_and_source_are_rejected_at_parse() {
    assert!(EventType::from_str("GraphCreated").is_ok());
    assert!(EventType::from_str("SomethingElse").is_err());
    assert!(EventSource::from_str("scheduler").is_ok());
    assert!(EventSource::from_str("intruder").is_err());
}
