// src/exec/backend.rs

//! Pluggable worker backend abstraction.
//!
//! The runtime talks to a `WorkerBackend` instead of a raw mpsc sender.
//! The core never invokes the executor itself: it only exposes "what is
//! ready now" (post-admission) and records the transitions the executor
//! reports back.
//!
//! - [`ChannelWorkerBackend`] is the production implementation: it
//!   forwards dispatched nodes over an mpsc channel that the
//!   out-of-process executor bridge consumes.
//! - Tests can provide their own `WorkerBackend` that records which nodes
//!   were dispatched and directly emits `NodeTerminated` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::DispatchedNode;
use crate::errors::{Error, Result};

/// Trait abstracting how admission-confirmed nodes are handed off.
pub trait WorkerBackend: Send {
    /// Dispatch the given nodes for execution.
    ///
    /// The implementation is free to:
    /// - forward them to an out-of-process executor (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests)
    fn dispatch(
        &mut self,
        nodes: Vec<DispatchedNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: forwards dispatched nodes over an mpsc channel.
pub struct ChannelWorkerBackend {
    tx: mpsc::Sender<DispatchedNode>,
}

impl ChannelWorkerBackend {
    pub fn new(tx: mpsc::Sender<DispatchedNode>) -> Self {
        Self { tx }
    }
}

impl WorkerBackend for ChannelWorkerBackend {
    fn dispatch(
        &mut self,
        nodes: Vec<DispatchedNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across
        // `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for node in nodes {
                tx.send(node)
                    .await
                    .map_err(|e| Error::msg(e.to_string()))?;
            }
            Ok(())
        })
    }
}
