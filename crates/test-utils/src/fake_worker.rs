use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use orchdag::engine::{DispatchedNode, NodeOutcome, RuntimeEvent};
use orchdag::errors::Result;
use orchdag::exec::WorkerBackend;

/// A fake worker backend that:
/// - records which nodes were "dispatched"
/// - immediately reports `NodeTerminated` for each, with an outcome
///   chosen by a caller-supplied predicate.
pub struct FakeWorker {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<String>>>,
    fail_nodes: Vec<String>,
}

impl FakeWorker {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
            fail_nodes: Vec::new(),
        }
    }

    /// Make the worker report failure for these node ids.
    pub fn failing(mut self, nodes: &[&str]) -> Self {
        self.fail_nodes = nodes.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl WorkerBackend for FakeWorker {
    fn dispatch(
        &mut self,
        nodes: Vec<DispatchedNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let fail_nodes = self.fail_nodes.clone();

        Box::pin(async move {
            for node in nodes {
                {
                    let mut guard = dispatched.lock().unwrap();
                    guard.push(node.node_id.clone());
                }

                let outcome = if fail_nodes.iter().any(|id| id == &node.node_id) {
                    NodeOutcome::Failed {
                        error: serde_json::json!({ "message": "simulated failure" }),
                    }
                } else {
                    NodeOutcome::Completed {
                        outputs: serde_json::Map::new(),
                    }
                };

                tx.send(RuntimeEvent::NodeTerminated {
                    node: node.node_id.clone(),
                    outcome,
                })
                .await
                .map_err(|e| anyhow::Error::msg(e.to_string()))?;
            }
            Ok(())
        })
    }
}
