//! Worker daemon: claims pending deliveries from the task store and drives
//! them against the Bronhouderportaal until shutdown.

use std::sync::Arc;

use anyhow::Context;

use brohub_core::{Config, EncryptionService};
use brohub_registry::{GeometryClient, RegistryClient};
use brohub_store::MemoryStore;
use brohub_worker::{DeliveryQueue, WellGeometry};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let encryption = Arc::new(
        EncryptionService::from_env()
            .context("Failed to load credential encryption key. Set CREDENTIALS_ENCRYPTION_KEY")?,
    );
    let registry = Arc::new(RegistryClient::new(&config)?);
    let geometry: Arc<dyn WellGeometry> = Arc::new(GeometryClient::new(&config)?);
    let store = Arc::new(MemoryStore::new());

    tracing::info!(
        portal = %config.portal_base_url,
        environment = %config.environment,
        "starting delivery worker"
    );

    let queue = DeliveryQueue::start(store, registry, Some(geometry), encryption, config);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    queue.shutdown().await;

    Ok(())
}
