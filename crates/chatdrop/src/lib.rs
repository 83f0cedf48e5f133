//! Unread chat message delivery.
//!
//! A polling client asks for its unread messages; each one comes back with a
//! per-user suffix appended and is then marked read in a best-effort batch.
//! Delivery is at-least-once: see [`coordinator`] for the accepted races.

pub mod acknowledger;
pub mod config;
pub mod coordinator;
pub mod document_store;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod model;
pub mod reconciler;
pub mod storage;
pub mod suffix;
pub mod testing;
pub mod transport;
pub mod types;

/// Prelude module for convenient glob imports.
pub mod prelude {
    pub use crate::config::ServiceConfig;
    pub use crate::coordinator::{Delivery, MessageDeliveryCoordinator};
    pub use crate::document_store::{Document, DocumentStore, Filter, WriteBatch};
    pub use crate::error::{ChatError, StoreError};
    pub use crate::metrics::DeliveryMetrics;
    pub use crate::types::{DocumentRef, UserId};
}
