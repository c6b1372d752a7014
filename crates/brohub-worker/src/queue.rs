//! Worker pool that drains the task store: pending upload tasks go through
//! the delivery pipeline, pending bulk jobs to their orchestrator.
//!
//! Shutdown: [`DeliveryQueue::shutdown`] signals the pool to stop claiming; it
//! does not wait for in-flight work. Give running deliveries time to reach a
//! terminal state before process exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use tracing::{debug, error, info};

use brohub_bulk::{GarBulkUploader, GldBulkUploader, GmnBulkUploader};
use brohub_core::models::{BulkUpload, BulkUploadStatus, BulkUploadType};
use brohub_core::{Config, EncryptionService};
use brohub_registry::RegistryApi;
use brohub_store::TaskStore;

use crate::delivery::{DeliveryPipeline, WellGeometry};

pub struct DeliveryQueue {
    shutdown_tx: mpsc::Sender<()>,
}

impl DeliveryQueue {
    /// Starts the pool. `worker_max_workers` bounds concurrent units of work;
    /// the store is polled every `worker_poll_interval_ms`.
    pub fn start<S, R>(
        store: Arc<S>,
        registry: Arc<R>,
        geometry: Option<Arc<dyn WellGeometry>>,
        encryption: Arc<EncryptionService>,
        config: Config,
    ) -> Self
    where
        S: TaskStore + 'static,
        R: RegistryApi + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(worker_pool(
            store,
            registry,
            geometry,
            encryption,
            config,
            shutdown_rx,
        ));
        DeliveryQueue { shutdown_tx }
    }

    /// Signals the pool to stop claiming new work and exit its loop. Returns
    /// immediately; already-spawned deliveries run to completion.
    pub async fn shutdown(&self) {
        info!("initiating delivery queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn worker_pool<S, R>(
    store: Arc<S>,
    registry: Arc<R>,
    geometry: Option<Arc<dyn WellGeometry>>,
    encryption: Arc<EncryptionService>,
    config: Config,
    mut shutdown_rx: mpsc::Receiver<()>,
) where
    S: TaskStore + 'static,
    R: RegistryApi + 'static,
{
    info!(
        max_workers = config.worker_max_workers,
        poll_interval_ms = config.worker_poll_interval_ms,
        "delivery worker pool started"
    );

    let semaphore = Arc::new(Semaphore::new(config.worker_max_workers));
    let poll_interval = Duration::from_millis(config.worker_poll_interval_ms);
    let mut pipeline = DeliveryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        Arc::clone(&encryption),
        &config,
    );
    if let Some(geometry) = geometry {
        pipeline = pipeline.with_geometry(geometry);
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("delivery worker pool shutting down");
                break;
            }
            _ = sleep(poll_interval) => {
                claim_and_dispatch_one(&store, &pipeline, &config, &semaphore).await;
            }
        }
    }

    info!("delivery worker pool stopped");
}

/// Claims at most one unit of work per cycle. Upload tasks take precedence
/// over bulk jobs, so bulk orchestrators waiting on their children do not
/// starve them.
async fn claim_and_dispatch_one<S, R>(
    store: &Arc<S>,
    pipeline: &DeliveryPipeline<S, R>,
    config: &Config,
    semaphore: &Arc<Semaphore>,
) where
    S: TaskStore + 'static,
    R: RegistryApi + 'static,
{
    let permit = match semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            debug!("no workers available, skipping claim");
            return;
        }
    };

    match store.pending_upload_tasks(1).await {
        Ok(tasks) => {
            if let Some(task) = tasks.into_iter().next() {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(err) = pipeline.process(task.id).await {
                        error!(task_id = %task.id, error = %err, "upload task processing failed");
                    }
                });
                return;
            }
        }
        Err(err) => {
            error!(error = %err, "failed to list pending upload tasks");
            return;
        }
    }

    match store.pending_bulk_uploads(1).await {
        Ok(bulks) => {
            if let Some(bulk) = bulks.into_iter().next() {
                let claimed = match store
                    .cas_bulk_upload_status(
                        bulk.id,
                        BulkUploadStatus::Pending,
                        BulkUploadStatus::Processing,
                    )
                    .await
                {
                    Ok(claimed) => claimed,
                    Err(err) => {
                        error!(bulk_id = %bulk.id, error = %err, "failed to claim bulk upload");
                        return;
                    }
                };
                if !claimed {
                    debug!(bulk_id = %bulk.id, "bulk upload already claimed, skipping");
                    return;
                }
                let store = Arc::clone(store);
                let config = config.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    run_bulk(store, config, bulk).await;
                });
            }
        }
        Err(err) => {
            error!(error = %err, "failed to list pending bulk uploads");
        }
    }
}

async fn run_bulk<S: TaskStore>(store: Arc<S>, config: Config, bulk: BulkUpload) {
    info!(bulk_id = %bulk.id, bulk_upload_type = %bulk.bulk_upload_type, "processing bulk upload");
    let outcome = match bulk.bulk_upload_type {
        BulkUploadType::Gar => {
            GarBulkUploader::new(store.as_ref(), &config)
                .process(bulk.id)
                .await
        }
        BulkUploadType::Gld => {
            GldBulkUploader::new(store.as_ref(), &config)
                .process(bulk.id)
                .await
        }
        BulkUploadType::Gmn => {
            GmnBulkUploader::new(store.as_ref(), &config)
                .process(bulk.id)
                .await
        }
    };
    if let Err(err) = outcome {
        error!(bulk_id = %bulk.id, error = %err, "bulk upload processing failed");
    }
}
