//! Bulk GMN orchestrator: one spreadsheet of monitoring network events fans
//! out into one task per row.
//!
//! The event column is free text; keywords decide which of the three event
//! documents a row becomes. The job then follows its child tasks and only
//! finishes when every one of them reached a terminal state.

use std::time::Duration;

use brohub_core::models::{
    BulkUpload, BulkUploadPatch, BulkUploadStatus, RegistrationType, RequestType, TaskStatus,
    UploadTask,
};
use brohub_core::payloads::Scalar;
use brohub_core::{AppError, Config};
use brohub_store::TaskStore;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::table::{excel_serial_to_date, Row, Table};

const COLUMN_NAMES: [&str; 5] = [
    "eventType",
    "measuringPointCode",
    "gmwBroId",
    "tubeNumber",
    "eventDate",
];

pub struct GmnBulkUploader<'a, S: TaskStore> {
    store: &'a S,
    emission_delay: Duration,
    settle_delay: Duration,
}

impl<'a, S: TaskStore> GmnBulkUploader<'a, S> {
    pub fn new(store: &'a S, config: &Config) -> Self {
        GmnBulkUploader {
            store,
            emission_delay: Duration::from_secs(config.bulk_emission_delay_secs),
            settle_delay: Duration::from_secs(config.delivery_poll_delay_secs),
        }
    }

    pub fn with_delays(mut self, emission: Duration, settle: Duration) -> Self {
        self.emission_delay = emission;
        self.settle_delay = settle;
        self
    }

    pub async fn process(&self, bulk_id: Uuid) -> Result<(), AppError> {
        let bulk = self.store.load_bulk_upload(bulk_id).await?;
        let files = self.store.upload_files_for_bulk(bulk_id).await?;

        let mut table = match self.load_table(&files).await {
            Ok(table) => table,
            Err(e) => {
                return self
                    .fail(bulk_id, None, format!("Failed to open the files: {}", e))
                    .await;
            }
        };
        if table.is_empty() {
            return self
                .fail(bulk_id, Some(10.0), "There is no data in the file".to_string())
                .await;
        }
        self.set_progress(bulk_id, 10.0).await?;

        table.rename_positional(&COLUMN_NAMES);
        self.set_progress(bulk_id, 20.0).await?;

        let per_row = 80.0 / table.len() as f64;
        let mut progress = 20.0;
        let mut emitted = Vec::new();

        for (index, row) in table.rows().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.emission_delay).await;
            }
            match build_event_task(&bulk, row) {
                Ok(task) => {
                    emitted.push(task.id);
                    self.store.insert_upload_task(task).await?;
                }
                Err(e) => {
                    let label = row.get("measuringPointCode").unwrap_or("?");
                    warn!(bulk = %bulk_id, measuring_point = label, "skipping GMN row: {}", e);
                    progress += per_row;
                    self.store
                        .update_bulk_upload(
                            bulk_id,
                            BulkUploadPatch {
                                progress: Some(progress),
                                append_log: Some(format!("Rij {} overgeslagen: {}.", label, e)),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
            }
        }
        info!(bulk = %bulk_id, tasks = emitted.len(), "emitted GMN event tasks");

        // Follow the children until every task has settled.
        while !emitted.is_empty() {
            tokio::time::sleep(self.settle_delay).await;
            let mut remaining = Vec::new();
            for task_id in emitted {
                let task = self.store.load_upload_task(task_id).await?;
                match task.status {
                    TaskStatus::Failed => {
                        progress += per_row;
                        self.store
                            .update_bulk_upload(
                                bulk_id,
                                BulkUploadPatch {
                                    progress: Some(progress),
                                    append_log: Some(format!(
                                        "FAILED (task: {}): {}.",
                                        task_id, task.log
                                    )),
                                    ..Default::default()
                                },
                            )
                            .await?;
                    }
                    TaskStatus::Completed | TaskStatus::Unfinished => {
                        progress += per_row;
                        self.set_progress(bulk_id, progress).await?;
                    }
                    _ => remaining.push(task_id),
                }
            }
            emitted = remaining;
        }

        self.store
            .update_bulk_upload(
                bulk_id,
                BulkUploadPatch {
                    status: Some(BulkUploadStatus::Finished),
                    progress: Some(100.0),
                    ..Default::default()
                },
            )
            .await
    }

    async fn load_table(
        &self,
        files: &[brohub_core::models::UploadFile],
    ) -> Result<Table, AppError> {
        let file = files
            .first()
            .ok_or_else(|| AppError::Internal("No event file was supplied".to_string()))?;
        let (_, content) = self.store.load_upload_file(file.id).await?;
        Table::from_bytes(&file.extension(), &content)
    }

    async fn set_progress(&self, bulk_id: Uuid, progress: f64) -> Result<(), AppError> {
        self.store
            .update_bulk_upload(
                bulk_id,
                BulkUploadPatch {
                    progress: Some(progress),
                    ..Default::default()
                },
            )
            .await
    }

    async fn fail(
        &self,
        bulk_id: Uuid,
        progress: Option<f64>,
        message: String,
    ) -> Result<(), AppError> {
        self.store
            .update_bulk_upload(
                bulk_id,
                BulkUploadPatch {
                    status: Some(BulkUploadStatus::Failed),
                    progress,
                    append_log: Some(message),
                    ..Default::default()
                },
            )
            .await
    }
}

fn build_event_task(bulk: &BulkUpload, row: Row<'_>) -> Result<UploadTask, AppError> {
    let event_type = row
        .get("eventType")
        .ok_or_else(|| AppError::invalid_payload("eventType", "Field required"))?;
    let registration_type = infer_event_type(event_type)?;
    let measuring_point_code = row
        .get("measuringPointCode")
        .ok_or_else(|| AppError::invalid_payload("measuringPointCode", "Field required"))?;
    let event_date = normalize_event_date(
        row.get("eventDate")
            .ok_or_else(|| AppError::invalid_payload("eventDate", "Field required"))?,
    )?;

    let mut metadata = bulk.metadata.clone();
    metadata["requestReference"] = Value::String(format!(
        "{}_{}_{}",
        event_type, measuring_point_code, event_date
    ));

    let mut document = json!({
        "eventDate": event_date,
        "measuringPointCode": measuring_point_code,
    });
    if let Some(bro_id) = row.get("gmwBroId") {
        document["broId"] = Value::String(bro_id.to_string());
    }
    if let Some(tube_number) = row.get("tubeNumber") {
        document["tubeNumber"] = serde_json::to_value(cell_scalar(tube_number))?;
    }

    Ok(UploadTask::new(
        bulk.data_owner,
        &bulk.project_number,
        registration_type,
        RequestType::Registration,
        metadata,
        document,
    ))
}

/// Maps free-text event descriptions onto the three GMN event documents.
/// End-date keywords win over tube-reference keywords, which win over
/// add-measuring-point keywords.
fn infer_event_type(raw: &str) -> Result<RegistrationType, AppError> {
    const END_DATE: [&str; 4] = ["end", "eind", "date", "datum"];
    const TUBE_REFERENCE: [&str; 5] = ["reference", "referentie", "verwijzing", "tube", "buis"];
    const MEASURING_POINT: [&str; 3] = ["add", "toevoegen", "meetpunt"];

    let lowered = raw.to_lowercase();
    if END_DATE.iter().any(|keyword| lowered.contains(keyword)) {
        Ok(RegistrationType::GmnMeasuringPointEndDate)
    } else if TUBE_REFERENCE.iter().any(|keyword| lowered.contains(keyword)) {
        Ok(RegistrationType::GmnTubeReference)
    } else if MEASURING_POINT.iter().any(|keyword| lowered.contains(keyword)) {
        Ok(RegistrationType::GmnMeasuringPoint)
    } else {
        Err(AppError::invalid_payload(
            "eventType",
            format!("Niet in staat het bericht-type te achterhalen: {}", raw),
        ))
    }
}

/// Accepts `YYYY-MM-DD`, the partial `YYYY-MM` and `YYYY` forms, or an Excel
/// serial number. Partial dates pass through unchanged; a bare four-digit
/// value is a year, not a serial.
fn normalize_event_date(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    if is_partial_date(raw) {
        return Ok(raw.to_string());
    }
    if let Some(date) = raw.parse::<f64>().ok().and_then(excel_serial_to_date) {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    Err(AppError::invalid_payload(
        "eventDate",
        format!("Datum moet voldoen aan YYYY-MM-DD formaat. {}", raw),
    ))
}

/// A four-digit year optionally followed by up to two two-digit parts.
fn is_partial_date(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('-').collect();
    parts.len() <= 3
        && parts[0].len() == 4
        && parts[1..].iter().all(|part| part.len() == 2)
        && parts
            .iter()
            .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
}

fn cell_scalar(raw: &str) -> Scalar {
    match raw.trim().parse::<i64>() {
        Ok(int) => Scalar::Int(int),
        Err(_) => Scalar::Text(raw.trim().to_string()),
    }
}
