// src/exec/mod.rs

//! Boundary to the external worker executor.

pub mod backend;

pub use backend::{ChannelWorkerBackend, WorkerBackend};
