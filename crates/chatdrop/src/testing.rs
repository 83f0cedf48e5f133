//! In-memory delivery harness for unit and integration testing.
//!
//! Wires a [`MessageDeliveryCoordinator`] to a [`MemoryDocumentStore`] and
//! unregistered metrics so tests can seed documents, inject faults, and inspect
//! store state without any external dependencies.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::coordinator::MessageDeliveryCoordinator;
use crate::metrics::DeliveryMetrics;
use crate::model::{READ_FIELD, SUFFIX_FIELD, TEXT_FIELD};
use crate::storage::memory_document::MemoryDocumentStore;
use crate::types::DocumentRef;

/// A coordinator over an in-memory store.
///
/// # Example
///
/// ```ignore
/// let harness = TestHarness::new();
/// harness.add_user("u1", "cat");
/// harness.add_message("m1", "hello", Some(false));
/// let messages = harness.coordinator.get_chat_messages(&UserId::new("u1")).await?;
/// ```
pub struct TestHarness {
    pub store: Arc<MemoryDocumentStore>,
    pub metrics: Arc<DeliveryMetrics>,
    pub coordinator: MessageDeliveryCoordinator,
    config: ServiceConfig,
}

impl TestHarness {
    /// Empty store, default configuration.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let metrics = Arc::new(DeliveryMetrics::unregistered());
        let coordinator =
            MessageDeliveryCoordinator::new(store.clone(), &config, Arc::clone(&metrics));
        Self {
            store,
            metrics,
            coordinator,
            config,
        }
    }

    /// Add a user profile with the given suffix preference value.
    pub fn add_user(&self, id: &str, suffix_code: impl Into<Value>) {
        let code: Value = suffix_code.into();
        self.store
            .insert(&self.config.users_collection, id, json!({ SUFFIX_FIELD: code }));
    }

    /// Add a message. `read: None` leaves the read flag unset.
    pub fn add_message(&self, id: &str, text: impl Into<Value>, read: Option<bool>) {
        let text: Value = text.into();
        let mut data = json!({ TEXT_FIELD: text });
        if let (Some(read), Value::Object(map)) = (read, &mut data) {
            map.insert(READ_FIELD.to_string(), Value::Bool(read));
        }
        self.store.insert(&self.config.messages_collection, id, data);
    }

    pub fn message_ref(&self, id: &str) -> DocumentRef {
        DocumentRef::new(self.config.messages_collection.as_str(), id)
    }

    /// Current `read` field of a message, `None` if unset or the message is missing.
    pub fn read_flag(&self, id: &str) -> Option<Value> {
        self.store
            .snapshot(&self.message_ref(id))
            .and_then(|doc| doc.get(READ_FIELD).cloned())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
