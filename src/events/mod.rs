// src/events/mod.rs

//! Append-only event log: the durable audit record of every state
//! transition, one JSON object per line.

pub mod log;

pub use log::{Event, EventContext, EventFilter, EventLog, EventSource, EventType};
