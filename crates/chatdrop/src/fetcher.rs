use std::sync::Arc;

use serde_json::Value;

use crate::document_store::{Document, DocumentStore, Filter};
use crate::error::ChatError;
use crate::model::READ_FIELD;

/// Selects messages whose read flag is present and not `true`.
pub struct UnreadMessageFetcher {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl UnreadMessageFetcher {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Snapshot of the unread set in store iteration order. May be empty.
    pub async fn fetch(&self) -> Result<Vec<Document>, ChatError> {
        self.store
            .query(&self.collection, &Filter::not_equal(READ_FIELD, Value::Bool(true)))
            .await
            .map_err(|e| ChatError::internal("failed to fetch messages", e))
    }
}
