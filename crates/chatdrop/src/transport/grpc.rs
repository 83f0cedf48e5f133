//! gRPC surface for message delivery.
//!
//! `GrpcChatServer` implements the generated `ChatService` trait on top of a
//! [`MessageDeliveryCoordinator`] and maps [`ChatError`] onto status codes.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::coordinator::MessageDeliveryCoordinator;
use crate::error::ChatError;
use crate::types::UserId;

/// Generated protobuf/gRPC code.
pub mod proto {
    tonic::include_proto!("chat");
}

use proto::chat_service_server::{ChatService, ChatServiceServer};

impl From<ChatError> for Status {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidArgument { .. } => Status::invalid_argument(err.to_string()),
            ChatError::UserNotFound { .. } => Status::not_found(err.to_string()),
            ChatError::Internal { .. } | ChatError::InvalidConfig { .. } => {
                Status::internal(err.to_string())
            }
        }
    }
}

/// gRPC server answering `GetChatMessages`.
pub struct GrpcChatServer {
    coordinator: Arc<MessageDeliveryCoordinator>,
}

impl GrpcChatServer {
    pub fn new(coordinator: Arc<MessageDeliveryCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Build a tonic [`ChatServiceServer`] ready to be added to a tonic router.
    pub fn into_service(self) -> ChatServiceServer<Self> {
        ChatServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl ChatService for GrpcChatServer {
    #[instrument(skip_all)]
    async fn get_chat_messages(
        &self,
        request: Request<proto::ChatRequest>,
    ) -> Result<Response<proto::ChatResponse>, Status> {
        let user_id = UserId::new(request.into_inner().user_id);
        match self.coordinator.get_chat_messages(&user_id).await {
            Ok(messages) => Ok(Response::new(proto::ChatResponse { messages })),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "GetChatMessages failed");
                Err(e.into())
            }
        }
    }
}
