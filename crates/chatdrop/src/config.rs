use crate::error::ChatError;
use crate::model::{MESSAGES_COLLECTION, USERS_COLLECTION};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the delivery service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the gRPC server binds to. Default: 0.0.0.0:8080.
    pub listen_address: SocketAddr,
    /// Collection holding user profiles. Default: "users".
    pub users_collection: String,
    /// Collection holding chat messages. Default: "messages".
    pub messages_collection: String,
    /// Per-request deadline enforced by the gRPC server. Default: 10s.
    pub request_timeout: Duration,
    /// Upper bound on a single acknowledgment batch. Zero disables the bound.
    /// Default: 5s.
    pub ack_timeout: Duration,
    /// Log every collection name at the start of each request. Default: false.
    pub log_collections: bool,
}

impl ServiceConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.users_collection.is_empty() {
            return Err(ChatError::InvalidConfig {
                reason: "users_collection must not be empty".to_string(),
            });
        }
        if self.messages_collection.is_empty() {
            return Err(ChatError::InvalidConfig {
                reason: "messages_collection must not be empty".to_string(),
            });
        }
        if self.users_collection == self.messages_collection {
            return Err(ChatError::InvalidConfig {
                reason: format!(
                    "users_collection and messages_collection must differ, both are {:?}",
                    self.users_collection
                ),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ChatError::InvalidConfig {
                reason: "request_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            users_collection: USERS_COLLECTION.to_string(),
            messages_collection: MESSAGES_COLLECTION.to_string(),
            request_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(5),
            log_collections: false,
        }
    }
}
