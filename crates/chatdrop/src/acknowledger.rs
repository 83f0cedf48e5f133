use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::document_store::{DocumentStore, WriteBatch};
use crate::metrics::DeliveryMetrics;
use crate::model::READ_FIELD;
use crate::types::DocumentRef;

/// Outcome of one acknowledgment batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckReport {
    pub attempted: usize,
    pub acknowledged: usize,
    pub failed: usize,
    /// The batch did not finish within the configured bound; its writes are
    /// counted as failed even though some may still land.
    pub timed_out: bool,
}

/// Handle to a spawned acknowledgment batch.
///
/// Dropping it leaves the batch running in the background.
#[derive(Debug)]
pub struct AckHandle {
    attempted: usize,
    task: Option<JoinHandle<AckReport>>,
}

impl AckHandle {
    fn empty() -> Self {
        Self {
            attempted: 0,
            task: None,
        }
    }

    /// Wait for the batch to finish.
    pub async fn wait(self) -> AckReport {
        let Some(task) = self.task else {
            return AckReport::default();
        };
        match task.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "acknowledgment task failed");
                AckReport {
                    attempted: self.attempted,
                    failed: self.attempted,
                    ..Default::default()
                }
            }
        }
    }
}

/// Marks delivered messages as read in a single best-effort batch.
///
/// Failures never reach the caller: they are logged and counted in
/// [`DeliveryMetrics::ack_failures`]. A message whose write fails stays
/// unread and is delivered again on a later call.
pub struct BulkAcknowledger {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<DeliveryMetrics>,
    /// Zero disables the bound.
    timeout: Duration,
}

impl BulkAcknowledger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        metrics: Arc<DeliveryMetrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            timeout,
        }
    }

    /// Queue `read = true` for every reference and flush on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn acknowledge(&self, targets: Vec<DocumentRef>) -> AckHandle {
        if targets.is_empty() {
            return AckHandle::empty();
        }

        let attempted = targets.len();
        let mut batch = WriteBatch::new();
        for target in targets {
            batch.enqueue(target, READ_FIELD, Value::Bool(true));
        }

        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let timeout = self.timeout;
        let span = tracing::debug_span!("acknowledge", count = attempted);

        let task = tokio::spawn(
            async move {
                let commit = store.commit_batch(batch);
                let outcome = if timeout.is_zero() {
                    commit.await
                } else {
                    match tokio::time::timeout(timeout, commit).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::warn!(
                                count = attempted,
                                timeout_ms = timeout.as_millis() as u64,
                                "acknowledgment batch timed out"
                            );
                            metrics.ack_failures.inc_by(attempted as u64);
                            return AckReport {
                                attempted,
                                failed: attempted,
                                timed_out: true,
                                ..Default::default()
                            };
                        }
                    }
                };

                for (target, error) in &outcome.failures {
                    tracing::warn!(document = %target, %error, "failed to mark message as read");
                }
                metrics.acknowledged.inc_by(outcome.committed as u64);
                metrics.ack_failures.inc_by(outcome.failures.len() as u64);
                tracing::debug!(
                    acknowledged = outcome.committed,
                    failed = outcome.failures.len(),
                    "acknowledgment batch flushed"
                );

                AckReport {
                    attempted,
                    acknowledged: outcome.committed,
                    failed: outcome.failures.len(),
                    timed_out: false,
                }
            }
            .instrument(span),
        );

        AckHandle {
            attempted,
            task: Some(task),
        }
    }
}
