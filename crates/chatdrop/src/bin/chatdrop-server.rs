//! chatdrop-server - gRPC front end for unread message delivery.
//!
//! Runs against an in-memory document store, optionally seeded from a JSON
//! fixture shaped `{"collection": {"doc-id": {...fields}}}`.
//!
//! ```bash
//! CHATDROP_SEED=crates/chatdrop/fixtures/dev.json cargo run --bin chatdrop-server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatdrop::config::ServiceConfig;
use chatdrop::coordinator::MessageDeliveryCoordinator;
use chatdrop::metrics::DeliveryMetrics;
use chatdrop::storage::memory_document::MemoryDocumentStore;
use chatdrop::transport::grpc::GrpcChatServer;
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "chatdrop-server")]
#[command(about = "Serve unread chat messages over gRPC")]
struct Args {
    /// gRPC listen address.
    #[arg(long, env = "CHATDROP_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: SocketAddr,

    /// JSON fixture used to seed the in-memory store.
    #[arg(long, env = "CHATDROP_SEED")]
    seed: Option<PathBuf>,

    #[arg(long, env = "CHATDROP_USERS_COLLECTION", default_value = "users")]
    users_collection: String,

    #[arg(long, env = "CHATDROP_MESSAGES_COLLECTION", default_value = "messages")]
    messages_collection: String,

    /// Per-request deadline in milliseconds.
    #[arg(long, env = "CHATDROP_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    request_timeout_ms: u64,

    /// Bound on one acknowledgment batch in milliseconds. 0 disables it.
    #[arg(long, env = "CHATDROP_ACK_TIMEOUT_MS", default_value_t = 5_000)]
    ack_timeout_ms: u64,

    /// Log the store's collections at the start of every request.
    #[arg(long, env = "CHATDROP_LOG_COLLECTIONS")]
    log_collections: bool,
}

impl Args {
    fn into_config(self) -> (ServiceConfig, Option<PathBuf>) {
        let config = ServiceConfig {
            listen_address: self.listen_addr,
            users_collection: self.users_collection,
            messages_collection: self.messages_collection,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            log_collections: self.log_collections,
        };
        (config, self.seed)
    }
}

fn load_store(seed: Option<PathBuf>) -> Result<MemoryDocumentStore> {
    let Some(path) = seed else {
        tracing::info!("starting with an empty document store");
        return Ok(MemoryDocumentStore::new());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let fixture: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("seed file {} is not valid JSON", path.display()))?;
    let store = MemoryDocumentStore::from_json(fixture)
        .with_context(|| format!("seed file {} has an unexpected shape", path.display()))?;
    tracing::info!(seed = %path.display(), "seeded document store");
    Ok(store)
}

fn log_metrics(registry: &Registry) {
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buf) {
        tracing::warn!(error = %e, "failed to encode metrics");
        return;
    }
    tracing::info!("final metrics:\n{}", String::from_utf8_lossy(&buf));
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("chatdrop=info".parse()?))
        .init();

    let (config, seed) = Args::parse().into_config();
    config.validate()?;

    let store = Arc::new(load_store(seed)?);
    let registry = Registry::new();
    let metrics = Arc::new(DeliveryMetrics::new(&registry)?);
    let coordinator = Arc::new(MessageDeliveryCoordinator::new(store, &config, metrics));
    let server = GrpcChatServer::new(coordinator);

    tracing::info!("gRPC server listening on {}", config.listen_address);
    tonic::transport::Server::builder()
        .timeout(config.request_timeout)
        .add_service(server.into_service())
        .serve_with_shutdown(config.listen_address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("gRPC server shut down");
    log_metrics(&registry);
    Ok(())
}
