use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::types::DocumentRef;

/// Snapshot of a document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub reference: DocumentRef,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(reference: DocumentRef, data: Map<String, Value>) -> Self {
        Self { reference, data }
    }

    pub fn id(&self) -> &str {
        &self.reference.id
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Query predicate over the documents of a single collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Documents where `field` is present and differs from `value`.
    /// A document without the field never matches.
    NotEqual { field: String, value: Value },
}

impl Filter {
    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::NotEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        match self {
            Filter::All => true,
            Filter::NotEqual { field, value } => data.get(field).is_some_and(|v| v != value),
        }
    }
}

/// A single field assignment queued in a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub target: DocumentRef,
    pub field: String,
    pub value: Value,
}

/// Field updates to be flushed together with [`DocumentStore::commit_batch`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<FieldWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, target: DocumentRef, field: impl Into<String>, value: Value) {
        self.writes.push(FieldWrite {
            target,
            field: field.into(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<FieldWrite> {
        self.writes
    }
}

/// Per-item result of a flushed batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub committed: usize,
    pub failures: Vec<(DocumentRef, StoreError)>,
}

/// Document store consumed by the delivery pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by reference. `Ok(None)` if it does not exist.
    async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, StoreError>;

    /// Return the documents of `collection` matching `filter`, in store iteration order.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Set one field on an existing document.
    async fn update(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Set `field` only if the document does not carry it yet, checked
    /// atomically with the write. `Ok(false)` means the field was already
    /// present and nothing was written.
    async fn update_if_missing(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<bool, StoreError>;

    /// Apply every queued write independently. A batch never fails as a whole.
    async fn commit_batch(&self, batch: WriteBatch) -> BatchOutcome;

    /// Names of the collections currently present. Diagnostic only.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}
