//! Bulk GLD orchestrator: a single time/value spreadsheet folds into one
//! aggregated GLD_Addition task.
//!
//! The measurement period is derived from the sorted timestamps. After the
//! task is emitted the job waits one settle period and mirrors the child's
//! terminal status; a child still in flight leaves the job UNFINISHED.

use std::time::Duration;

use brohub_core::models::{
    BulkUpload, BulkUploadPatch, BulkUploadStatus, RegistrationType, RequestType, TaskStatus,
    UploadTask,
};
use brohub_core::payloads::{Scalar, TimeValuePair};
use brohub_core::{AppError, Config};
use brohub_store::TaskStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::table::Table;

const COLUMN_NAMES: [&str; 5] = [
    "time",
    "value",
    "statusQualityControl",
    "censorReason",
    "censoringLimitvalue",
];

pub struct GldBulkUploader<'a, S: TaskStore> {
    store: &'a S,
    settle_delay: Duration,
}

impl<'a, S: TaskStore> GldBulkUploader<'a, S> {
    pub fn new(store: &'a S, config: &Config) -> Self {
        GldBulkUploader {
            store,
            settle_delay: Duration::from_secs(config.bulk_emission_delay_secs),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub async fn process(&self, bulk_id: Uuid) -> Result<(), AppError> {
        let bulk = self.store.load_bulk_upload(bulk_id).await?;
        let files = self.store.upload_files_for_bulk(bulk_id).await?;

        let table = match self.load_table(&files).await {
            Ok(table) => table,
            Err(e) => {
                return self
                    .fail(bulk_id, None, format!("Failed to open the files: {}", e))
                    .await;
            }
        };
        self.set_progress(bulk_id, 10.0).await?;

        let task = match build_addition_task(&bulk, table) {
            Ok(task) => task,
            Err(e) => {
                return self
                    .fail(
                        bulk_id,
                        Some(20.0),
                        format!("Failed to transform the files: {}", e),
                    )
                    .await;
            }
        };
        self.set_progress(bulk_id, 20.0).await?;

        let task_id = task.id;
        // The aggregated document is kept on the bulk record too, so the
        // operator can inspect what was derived from the file.
        self.store
            .update_bulk_upload(
                bulk_id,
                BulkUploadPatch {
                    sourcedocument_data: Some(task.sourcedocument_data.clone()),
                    progress: Some(50.0),
                    ..Default::default()
                },
            )
            .await?;
        self.store.insert_upload_task(task).await?;
        info!(bulk = %bulk_id, task = %task_id, "emitted aggregated GLD_Addition task");

        tokio::time::sleep(self.settle_delay).await;

        let child = self.store.load_upload_task(task_id).await?;
        let patch = match child.status {
            TaskStatus::Completed => BulkUploadPatch {
                status: Some(BulkUploadStatus::Finished),
                progress: Some(100.0),
                ..Default::default()
            },
            TaskStatus::Failed => BulkUploadPatch {
                status: Some(BulkUploadStatus::Failed),
                progress: Some(100.0),
                append_log: Some(format!("Upload logging: {}.", child.log)),
                ..Default::default()
            },
            _ => BulkUploadPatch {
                status: Some(BulkUploadStatus::Unfinished),
                append_log: Some(format!(
                    "After {} seconds the upload is not yet finished.",
                    self.settle_delay.as_secs()
                )),
                ..Default::default()
            },
        };
        self.store.update_bulk_upload(bulk_id, patch).await
    }

    async fn load_table(&self, files: &[brohub_core::models::UploadFile]) -> Result<Table, AppError> {
        let file = files
            .first()
            .ok_or_else(|| AppError::Internal("No measurement file was supplied".to_string()))?;
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

fn build_addition_task(bulk: &BulkUpload, mut table: Table) -> Result<UploadTask, AppError> {
    if table.is_empty() {
        return Err(AppError::Internal("There is no data in the file".to_string()));
    }
    if table.columns().len() != COLUMN_NAMES.len() {
        return Err(AppError::Internal(format!(
            "Expected {} columns (time, value, statusQualityControl, censorReason, \
             censoringLimitvalue), got {}",
            COLUMN_NAMES.len(),
            table.columns().len()
        )));
    }
    table.rename_positional(&COLUMN_NAMES);
    table.sort_by_column("time")?;

    let mut pairs = Vec::with_capacity(table.len());
    for row in table.rows() {
        let time = row
            .get("time")
            .ok_or_else(|| AppError::invalid_payload("time", "Field required"))?;
        pairs.push(TimeValuePair {
            time: time.to_string(),
            // censored measurements may leave the value blank
            value: row
                .get("value")
                .map(cell_scalar)
                .unwrap_or_else(|| Scalar::Text(String::new())),
            status_quality_control: row
                .get("statusQualityControl")
                .unwrap_or("onbekend")
                .to_string(),
            censor_reason: row.get("censorReason").map(str::to_string),
            censoring_limitvalue: row.get("censoringLimitvalue").map(cell_scalar),
        });
    }

    let begin_position = parse_position(&pairs[0].time)?;
    let end_position = parse_position(&pairs[pairs.len() - 1].time)?;
    let fully_assessed = bulk
        .sourcedocument_data
        .get("validationStatus")
        .and_then(Value::as_str)
        == Some("volledigBeoordeeld");
    let result_time = if fully_assessed {
        end_position + chrono::Duration::days(1)
    } else {
        end_position
    };

    let mut document = bulk.sourcedocument_data.clone();
    let fields = document
        .as_object_mut()
        .ok_or_else(|| AppError::invalid_payload("sourcedocument_data", "Expected an object"))?;
    fields.insert(
        "beginPosition".to_string(),
        json!(begin_position.format("%Y-%m-%dT%H:%M:%S").to_string()),
    );
    fields.insert(
        "endPosition".to_string(),
        json!(end_position.format("%Y-%m-%dT%H:%M:%S").to_string()),
    );
    fields.insert(
        "resultTime".to_string(),
        json!(result_time.format("%Y-%m-%dT%H:%M:%S").to_string()),
    );
    fields.insert(
        "date".to_string(),
        json!(result_time.format("%Y-%m-%d").to_string()),
    );
    fields.insert("timeValuePairs".to_string(), serde_json::to_value(&pairs)?);

    let metadata = json!({
        "qualityRegime": metadata_str(&bulk.metadata, "qualityRegime")?,
        "requestReference": metadata_str(&bulk.metadata, "requestReference")?,
    });

    Ok(UploadTask::new(
        bulk.data_owner,
        &bulk.project_number,
        RegistrationType::GldAddition,
        RequestType::Registration,
        metadata,
        document,
    ))
}

/// Accepts `YYYY-mm-ddTHH:MM:SS` with or without a timezone suffix; zoned
/// stamps are converted to UTC.
fn parse_position(raw: &str) -> Result<NaiveDateTime, AppError> {
    if raw.len() == 19 {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map_err(|_| bad_time(raw))
    } else if raw.len() > 19 {
        DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
            .map(|zoned| zoned.with_timezone(&Utc).naive_utc())
            .map_err(|_| bad_time(raw))
    } else {
        Err(bad_time(raw))
    }
}

fn bad_time(raw: &str) -> AppError {
    AppError::invalid_payload(
        "time",
        format!(
            "Time has incorrect format, use: YYYY-mm-ddTHH:MM:SS+-Timezone. Not: {}.",
            raw
        ),
    )
}

fn cell_scalar(raw: &str) -> Scalar {
    let normalized = raw.trim().replace(',', ".");
    if let Ok(int) = normalized.parse::<i64>() {
        Scalar::Int(int)
    } else if let Ok(float) = normalized.parse::<f64>() {
        Scalar::Float(float)
    } else {
        Scalar::Text(raw.trim().to_string())
    }
}

fn metadata_str(metadata: &Value, key: &str) -> Result<String, AppError> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::invalid_payload(key, "Field required"))
}
