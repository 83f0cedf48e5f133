//! One request/response cycle of unread message delivery.
//!
//! Delivery is at-least-once. Nothing serialises concurrent callers, so two
//! requests can select the same unread message before either acknowledges it,
//! and an acknowledgment that fails leaves the message unread for the next
//! call. Both outcomes are accepted.

use std::sync::Arc;

use tracing::instrument;

use crate::acknowledger::{AckHandle, BulkAcknowledger};
use crate::config::ServiceConfig;
use crate::document_store::DocumentStore;
use crate::error::ChatError;
use crate::fetcher::UnreadMessageFetcher;
use crate::metrics::DeliveryMetrics;
use crate::model::message_text;
use crate::reconciler::ReadStateReconciler;
use crate::suffix::UserSuffixResolver;
use crate::types::{DocumentRef, UserId};

/// Messages composed for one call plus the acknowledgment still in flight.
#[derive(Debug)]
pub struct Delivery {
    pub messages: Vec<String>,
    pub ack: AckHandle,
}

/// Runs reconcile → resolve → fetch → decorate → acknowledge for a user.
pub struct MessageDeliveryCoordinator {
    store: Arc<dyn DocumentStore>,
    reconciler: ReadStateReconciler,
    suffixes: UserSuffixResolver,
    fetcher: UnreadMessageFetcher,
    acknowledger: BulkAcknowledger,
    metrics: Arc<DeliveryMetrics>,
    log_collections: bool,
}

impl MessageDeliveryCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: &ServiceConfig,
        metrics: Arc<DeliveryMetrics>,
    ) -> Self {
        Self {
            reconciler: ReadStateReconciler::new(
                Arc::clone(&store),
                config.messages_collection.as_str(),
                Arc::clone(&metrics),
            ),
            suffixes: UserSuffixResolver::new(Arc::clone(&store), config.users_collection.as_str()),
            fetcher: UnreadMessageFetcher::new(
                Arc::clone(&store),
                config.messages_collection.as_str(),
            ),
            acknowledger: BulkAcknowledger::new(
                Arc::clone(&store),
                Arc::clone(&metrics),
                config.ack_timeout,
            ),
            store,
            metrics,
            log_collections: config.log_collections,
        }
    }

    /// Decorated unread messages for `user_id`. The acknowledgment runs detached.
    pub async fn get_chat_messages(&self, user_id: &UserId) -> Result<Vec<String>, ChatError> {
        let delivery = self.deliver(user_id).await?;
        Ok(delivery.messages)
    }

    /// Like [`get_chat_messages`](Self::get_chat_messages) but hands back the
    /// acknowledgment handle so the caller can observe it.
    #[instrument(skip_all, fields(%user_id))]
    pub async fn deliver(&self, user_id: &UserId) -> Result<Delivery, ChatError> {
        if user_id.is_empty() {
            return Err(ChatError::InvalidArgument {
                reason: "user_id must not be empty".to_string(),
            });
        }

        if self.log_collections {
            self.log_store_collections().await;
        }

        self.reconciler.reconcile().await?;
        let suffix = self.suffixes.resolve(user_id).await?;

        let unread = self.fetcher.fetch().await?;
        if unread.is_empty() {
            tracing::debug!("no new messages");
            return Ok(Delivery {
                messages: Vec::new(),
                ack: self.acknowledger.acknowledge(Vec::new()),
            });
        }

        let mut messages = Vec::with_capacity(unread.len());
        let mut delivered: Vec<DocumentRef> = Vec::with_capacity(unread.len());
        for doc in unread {
            let Some(text) = message_text(&doc) else {
                tracing::warn!(document = %doc.reference, "invalid message format, skipping");
                self.metrics.skipped.inc();
                continue;
            };
            messages.push(format!("{text}{suffix}"));
            delivered.push(doc.reference);
        }

        self.metrics.delivered.inc_by(messages.len() as u64);
        tracing::info!(count = messages.len(), "delivering unread messages");

        let ack = self.acknowledger.acknowledge(delivered);
        Ok(Delivery { messages, ack })
    }

    async fn log_store_collections(&self) {
        match self.store.list_collections().await {
            Ok(names) => {
                for name in names {
                    tracing::debug!(collection = %name, "document store collection");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list collections"),
        }
    }
}
