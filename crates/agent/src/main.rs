//! Utilization Agent - per-container resource usage recorder
//!
//! Polls kubelet summary stats for a fixed set of nodes on a fixed cadence
//! and appends one sample per container to the sorted-set store.

use agent_lib::{
    collector::{KubeletClient, PollerBuilder},
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    store::{RedisStore, StoreWriter},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use util_agent::{api, config};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting util-agent");

    // Load configuration; an empty node list stops us here
    let config = config::AgentConfig::load()?;
    let poller_config = config.poller_config();

    let health_registry = HealthRegistry::new();
    health_registry.register(components::POLLER).await;
    health_registry.register(components::STORE).await;

    // No point running without a store
    let store_config = config.store_config();
    let store = RedisStore::connect(&store_config)
        .await
        .with_context(|| format!("Unable to connect to store at {}", store_config.addr()))?;
    health_registry.mark_store_connected().await;

    let fetcher = KubeletClient::new(&config.kubelet_client_config())?;

    let logger = StructuredLogger::new("util-agent");
    logger.log_startup(
        AGENT_VERSION,
        &poller_config.nodes,
        &poller_config.namespace,
        poller_config.cadence.as_millis() as u64,
    );

    // Start health, status and metrics server
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        api::RecorderInfo::new(AGENT_VERSION, &poller_config),
    ));
    let api_port = config.api_port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server stopped");
        }
    });

    let poller = PollerBuilder::new()
        .fetcher(Arc::new(fetcher))
        .writer(StoreWriter::new(Arc::new(store)))
        .config(poller_config)
        .health(health_registry)
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    // The in-flight tick finishes before the poller exits
    let _ = shutdown_tx.send(());
    poller_handle.await.context("Poller task failed")?;
    api_handle.abort();

    info!("Shutting down");
    Ok(())
}
