use crate::types::{DocumentRef, UserId};

/// Errors returned by a [`DocumentStore`](crate::document_store::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("document not found: {target}")]
    DocumentNotFound { target: DocumentRef },

    #[error("document store operation failed: {reason}")]
    Operation { reason: String },
}

/// Errors surfaced by the delivery pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("user not found: {user_id}")]
    UserNotFound { user_id: UserId },

    #[error("{reason}")]
    Internal {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ChatError {
    /// Wrap a store failure as an internal error with the given context.
    pub fn internal(context: &str, err: StoreError) -> Self {
        ChatError::Internal {
            reason: format!("{context}: {err}"),
            source: Some(Box::new(err)),
        }
    }
}
