use std::sync::Arc;

use serde_json::Value;

use crate::document_store::{DocumentStore, Filter};
use crate::error::ChatError;
use crate::metrics::DeliveryMetrics;
use crate::model::{ReadState, READ_FIELD};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub backfilled: usize,
    /// Flags set by someone else between the scan and the write.
    pub skipped: usize,
    pub failed: usize,
}

/// Gives every message without a read flag an explicit `read = false`.
///
/// Messages written before read tracking existed carry no flag at all, and a
/// not-equal-to-true query never matches a missing field. Backfilling makes
/// them visible to [`UnreadMessageFetcher`](crate::fetcher::UnreadMessageFetcher).
pub struct ReadStateReconciler {
    store: Arc<dyn DocumentStore>,
    collection: String,
    metrics: Arc<DeliveryMetrics>,
}

impl ReadStateReconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        metrics: Arc<DeliveryMetrics>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            metrics,
        }
    }

    /// Scan the whole collection and backfill missing flags one document at a time.
    ///
    /// The write only lands if the flag is still missing, so a message that was
    /// read after the scan is never put back to unread. Write failures are
    /// logged and counted; only a failed scan is an error.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ChatError> {
        let docs = self
            .store
            .query(&self.collection, &Filter::All)
            .await
            .map_err(|e| ChatError::internal("failed to scan messages", e))?;

        let mut report = ReconcileReport {
            scanned: docs.len(),
            ..Default::default()
        };

        for doc in docs.iter().filter(|d| ReadState::of(d) == ReadState::Unset) {
            match self
                .store
                .update_if_missing(&doc.reference, READ_FIELD, Value::Bool(false))
                .await
            {
                Ok(true) => {
                    report.backfilled += 1;
                    tracing::debug!(document = %doc.reference, "backfilled read flag");
                }
                Ok(false) => {
                    report.skipped += 1;
                    tracing::debug!(document = %doc.reference, "read flag set concurrently");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        document = %doc.reference,
                        error = %e,
                        "failed to backfill read flag"
                    );
                }
            }
        }

        self.metrics.backfilled.inc_by(report.backfilled as u64);
        if report.backfilled > 0 || report.failed > 0 {
            tracing::info!(
                scanned = report.scanned,
                backfilled = report.backfilled,
                failed = report.failed,
                "read-state reconciliation finished"
            );
        }
        Ok(report)
    }
}
