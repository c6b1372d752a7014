//! The delivery pipeline: drives one upload task from PENDING to a terminal
//! state against the Bronhouderportaal.
//!
//! Every failure a step can produce is translated into a terminal
//! `(status, progress, log, bro_errors)` write on the task record. Errors are
//! never re-thrown past this module; the queue only sees store failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use brohub_core::error::simplify_validation_issues;
use brohub_core::models::{
    Organisation, RegistrationType, RequestType, TaskStatus, UploadTask, UploadTaskPatch,
};
use brohub_core::payloads::coerce::format_decimal;
use brohub_core::payloads::{metadata_from_value, Metadata, Scalar, SourceDocument};
use brohub_core::{AppError, Config, EncryptionService, ValidationIssue};
use brohub_registry::{GeometryClient, RegistryApi};
use brohub_store::TaskStore;
use brohub_xml::render_request;

/// Registry complaint that marks a registration as predating an already
/// registered event. Such a task is retried as an insert with an own-correction
/// reason; this is the hub's single piece of automatic recovery.
pub const INSERT_REWRITE_TRIGGER: &str = "mag niet voor de laatst geregistreerde gebeurtenis";

/// Well geometry lookup used by the tube-length fixup. The production
/// implementation is [`GeometryClient`]; tests substitute a canned one.
#[async_trait]
pub trait WellGeometry: Send + Sync {
    async fn screen_top_position(
        &self,
        bro_id: &str,
        tube_number: &str,
    ) -> Result<Option<f64>, AppError>;
}

#[async_trait]
impl WellGeometry for GeometryClient {
    async fn screen_top_position(
        &self,
        bro_id: &str,
        tube_number: &str,
    ) -> Result<Option<f64>, AppError> {
        GeometryClient::screen_top_position(self, bro_id, tube_number).await
    }
}

pub struct DeliveryPipeline<S, R> {
    store: Arc<S>,
    registry: Arc<R>,
    geometry: Option<Arc<dyn WellGeometry>>,
    encryption: Arc<EncryptionService>,
    poll_attempts: u32,
    poll_delay: Duration,
}

impl<S, R> Clone for DeliveryPipeline<S, R> {
    fn clone(&self) -> Self {
        DeliveryPipeline {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            geometry: self.geometry.clone(),
            encryption: Arc::clone(&self.encryption),
            poll_attempts: self.poll_attempts,
            poll_delay: self.poll_delay,
        }
    }
}

impl<S: TaskStore, R: RegistryApi> DeliveryPipeline<S, R> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<R>,
        encryption: Arc<EncryptionService>,
        config: &Config,
    ) -> Self {
        DeliveryPipeline {
            store,
            registry,
            geometry: None,
            encryption,
            poll_attempts: config.delivery_poll_attempts,
            poll_delay: Duration::from_secs(config.delivery_poll_delay_secs),
        }
    }

    pub fn with_geometry(mut self, geometry: Arc<dyn WellGeometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Claims and processes one task. The PENDING to PROCESSING transition is
    /// a compare-and-set, so concurrent triggers for the same task id resolve
    /// to a single delivery; the losers return without touching the task.
    ///
    /// `Err` only reports store failures. Delivery problems end up on the task
    /// record itself.
    pub async fn process(&self, task_id: Uuid) -> Result<(), AppError> {
        let claimed = self
            .store
            .cas_upload_task_status(task_id, TaskStatus::Pending, TaskStatus::Processing)
            .await?;
        if !claimed {
            debug!(task_id = %task_id, "task already claimed, skipping");
            return Ok(());
        }

        let mut task = self.store.load_upload_task(task_id).await?;
        self.apply_insert_rewrite(&mut task).await?;

        info!(
            task_id = %task.id,
            registration_type = %task.registration_type,
            request_type = %task.request_type,
            "processing upload task"
        );

        match self.run(&mut task).await {
            Ok(()) => Ok(()),
            Err(err) => self.write_failure(&task, err).await,
        }
    }

    /// Reclassifies a task that the registry rejected for temporal ordering:
    /// it is retried as an insert with correctionReason eigenCorrectie. The
    /// rewrite is one atomic patch.
    async fn apply_insert_rewrite(&self, task: &mut UploadTask) -> Result<(), AppError> {
        if !task.bro_errors.contains(INSERT_REWRITE_TRIGGER) {
            return Ok(());
        }
        info!(task_id = %task.id, "rewriting rejected registration as insert");

        let mut metadata = task.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.insert(
                "correctionReason".to_string(),
                Value::String("eigenCorrectie".to_string()),
            );
        }
        let patch = UploadTaskPatch {
            request_type: Some(RequestType::Insert),
            metadata: Some(metadata),
            bro_errors: Some(String::new()),
            ..Default::default()
        };
        self.store.update_upload_task(task.id, patch.clone()).await?;
        patch.apply(task);
        Ok(())
    }

    async fn run(&self, task: &mut UploadTask) -> Result<(), AppError> {
        let organisation = self.store.load_organisation(task.data_owner).await?;
        let credentials = organisation.credentials(&self.encryption)?;

        let mut metadata = metadata_from_value(&task.metadata)?;
        suppress_own_accountable_party(&mut metadata, &organisation);

        if matches!(
            task.registration_type,
            RegistrationType::GmwShortening | RegistrationType::GmwLengthening
        ) {
            self.inject_tube_lengths(task, &metadata).await;
        }

        let document = SourceDocument::from_value(task.registration_type, &task.sourcedocument_data)?;
        let xml = render_request(task.request_type, task.registration_type, &metadata, &document)?;
        self.advance(task, 25.0).await?;

        let outcome = self
            .registry
            .validate_xml(&task.project_number, &credentials, &xml)
            .await?;
        if !outcome.is_valid() {
            return Err(AppError::BusinessValidation(issues_from_messages(
                &outcome.errors,
            )));
        }
        self.advance(task, 50.0).await?;

        let upload_url = self
            .registry
            .create_upload(&task.project_number, &credentials)
            .await?;
        self.registry
            .attach_document(&upload_url, &credentials, &xml)
            .await?;
        let delivery_url = self
            .registry
            .create_delivery(&task.project_number, &credentials, &upload_url)
            .await?;
        self.store
            .update_upload_task(
                task.id,
                UploadTaskPatch {
                    progress: Some(75.0),
                    bro_delivery_url: Some(delivery_url.clone()),
                    ..Default::default()
                },
            )
            .await?;
        task.progress = 75.0;

        for attempt in 1..=self.poll_attempts {
            let delivery = self
                .registry
                .check_delivery(&delivery_url, &credentials)
                .await?;
            if delivery.is_complete() {
                let log = match delivery.bro_id() {
                    Some(bro_id) => format!("Upload geslaagd: {bro_id}"),
                    None => "Upload geslaagd.".to_string(),
                };
                self.store
                    .update_upload_task(
                        task.id,
                        UploadTaskPatch {
                            status: Some(TaskStatus::Completed),
                            progress: Some(100.0),
                            log: Some(log),
                            bro_id: delivery.bro_id().map(str::to_string),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.store
                    .increment_organisation_counter(organisation.id)
                    .await?;
                info!(
                    task_id = %task.id,
                    bro_id = delivery.bro_id().unwrap_or_default(),
                    attempt,
                    "delivery completed"
                );
                return Ok(());
            }
            if delivery.has_errors() {
                return Err(AppError::BusinessValidation(issues_from_messages(
                    &delivery.errors(),
                )));
            }
            debug!(task_id = %task.id, attempt, status = %delivery.status, "delivery not yet terminal");
            if attempt < self.poll_attempts {
                sleep(self.poll_delay).await;
            }
        }
        Err(AppError::PollTimeout {
            attempts: self.poll_attempts,
        })
    }

    async fn advance(&self, task: &mut UploadTask, progress: f64) -> Result<(), AppError> {
        self.store
            .update_upload_task(
                task.id,
                UploadTaskPatch {
                    progress: Some(progress),
                    ..Default::default()
                },
            )
            .await?;
        task.progress = progress;
        Ok(())
    }

    /// For shortening and lengthening events the plain tube part length can
    /// be derived from the registered well geometry when the caller left it
    /// out. Lookup failures are swallowed; the delivery proceeds as supplied.
    async fn inject_tube_lengths(&self, task: &mut UploadTask, metadata: &Metadata) {
        let Some(geometry) = self.geometry.as_deref() else {
            return;
        };
        let Some(bro_id) = metadata.bro_id.clone() else {
            return;
        };

        let pending: Vec<(usize, String, f64)> = match task
            .sourcedocument_data
            .get("monitoringTubes")
            .and_then(Value::as_array)
        {
            Some(tubes) => tubes
                .iter()
                .enumerate()
                .filter(|(_, tube)| tube.get("plainTubePartLength").is_none())
                .filter_map(|(index, tube)| {
                    let number = scalar_of(tube.get("tubeNumber")?)?.render();
                    let top = scalar_of(tube.get("tubeTopPosition")?)?.as_f64()?;
                    Some((index, number, top))
                })
                .collect(),
            None => return,
        };

        let mut filled = false;
        for (index, tube_number, tube_top) in pending {
            let screen_top = match geometry.screen_top_position(&bro_id, &tube_number).await {
                Ok(Some(position)) => position,
                Ok(None) => {
                    debug!(bro_id = %bro_id, tube_number = %tube_number, "no geometry found for tube");
                    continue;
                }
                Err(err) => {
                    warn!(bro_id = %bro_id, tube_number = %tube_number, error = %err, "geometry lookup failed, continuing without");
                    continue;
                }
            };
            let length = format_decimal(tube_top - screen_top, 3);
            if let Some(tube) = task
                .sourcedocument_data
                .get_mut("monitoringTubes")
                .and_then(Value::as_array_mut)
                .and_then(|tubes| tubes.get_mut(index))
                .and_then(Value::as_object_mut)
            {
                debug!(bro_id = %bro_id, tube_number = %tube_number, length = %length, "injected plain tube part length");
                tube.insert("plainTubePartLength".to_string(), Value::String(length));
                filled = true;
            }
        }

        if filled {
            let patch = UploadTaskPatch {
                sourcedocument_data: Some(task.sourcedocument_data.clone()),
                ..Default::default()
            };
            if let Err(err) = self.store.update_upload_task(task.id, patch).await {
                warn!(task_id = %task.id, error = %err, "failed to persist injected tube lengths");
            }
        }
    }

    /// Terminal write for a failed or stalled delivery. Which fields are
    /// written follows the error kind; partial state such as the delivery URL
    /// is kept for diagnostics.
    async fn write_failure(&self, task: &UploadTask, err: AppError) -> Result<(), AppError> {
        warn!(task_id = %task.id, error = %err, "delivery ended in a non-completed state");
        let patch = match &err {
            AppError::PollTimeout { .. } => UploadTaskPatch {
                status: Some(TaskStatus::Unfinished),
                progress: Some(95.0),
                log: Some(err.task_log()),
                ..Default::default()
            },
            AppError::InvalidPayload { field_path, reason } => UploadTaskPatch {
                status: Some(TaskStatus::Failed),
                progress: Some(50.0),
                log: Some(err.task_log()),
                bro_errors: Some(payload_issue(field_path, reason)),
                ..Default::default()
            },
            AppError::BusinessValidation(issues) => UploadTaskPatch {
                status: Some(TaskStatus::Failed),
                progress: Some(task.progress.max(50.0)),
                log: Some(err.task_log()),
                bro_errors: Some(simplify_validation_issues(issues)),
                ..Default::default()
            },
            _ => UploadTaskPatch {
                status: Some(TaskStatus::Failed),
                log: Some(err.task_log()),
                ..Default::default()
            },
        };
        self.store.update_upload_task(task.id, patch).await
    }
}

/// The accountable party element is only delivered when it differs from the
/// owning organisation; a party delivering for itself leaves it out.
fn suppress_own_accountable_party(metadata: &mut Metadata, organisation: &Organisation) {
    if metadata.delivery_accountable_party.as_deref() == Some(organisation.kvk_number.as_str()) {
        metadata.delivery_accountable_party = None;
    }
}

fn scalar_of(value: &Value) -> Option<Scalar> {
    serde_json::from_value(value.clone()).ok()
}

/// Registry error lines already carry a `path: message` shape; anything else
/// is attributed to the document as a whole.
fn issues_from_messages(messages: &[String]) -> Vec<ValidationIssue> {
    messages
        .iter()
        .map(|message| match message.split_once(": ") {
            Some((path, rest)) => ValidationIssue::new(path, rest),
            None => ValidationIssue::new("document", message.clone()),
        })
        .collect()
}

fn payload_issue(field_path: &str, reason: &str) -> String {
    if reason.contains("missing field") {
        format!("{field_path}: Field required")
    } else {
        format!("{field_path}: {reason}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_lines_keep_their_path() {
        let issues = issues_from_messages(&[
            "requestReference: Field required".to_string(),
            "het document is afgekeurd".to_string(),
        ]);
        assert_eq!(issues[0].path, "requestReference");
        assert_eq!(issues[0].message, "Field required");
        assert_eq!(issues[1].path, "document");
        assert_eq!(
            simplify_validation_issues(&issues),
            "requestReference: Field required; document: het document is afgekeurd"
        );
    }

    #[test]
    fn missing_field_reason_becomes_field_required() {
        assert_eq!(
            payload_issue("requestReference", "missing field `requestReference` at line 1"),
            "requestReference: Field required"
        );
        assert_eq!(
            payload_issue("tubeNumber", "invalid type: string, expected number"),
            "tubeNumber: invalid type: string, expected number"
        );
    }

    #[test]
    fn own_kvk_suppresses_accountable_party() {
        let mut organisation = Organisation::new("Provincie Test", "27376655");
        organisation.kvk_number = "27376655".to_string();
        let mut metadata = Metadata {
            request_reference: "ref".to_string(),
            delivery_accountable_party: Some("27376655".to_string()),
            quality_regime: "IMBRO".to_string(),
            bro_id: None,
            under_privilege: None,
            correction_reason: None,
        };
        suppress_own_accountable_party(&mut metadata, &organisation);
        assert!(metadata.delivery_accountable_party.is_none());

        metadata.delivery_accountable_party = Some("87654321".to_string());
        suppress_own_accountable_party(&mut metadata, &organisation);
        assert_eq!(metadata.delivery_accountable_party.as_deref(), Some("87654321"));
    }

    #[test]
    fn rewrite_trigger_matches_the_registry_phrase() {
        let message =
            "Op 2025-01 gebeurtenis mag niet voor de laatst geregistreerde gebeurtenis 2025-02 liggen.";
        assert!(message.contains(INSERT_REWRITE_TRIGGER));
        assert!(!"requestReference: Field required".contains(INSERT_REWRITE_TRIGGER));
    }
}
