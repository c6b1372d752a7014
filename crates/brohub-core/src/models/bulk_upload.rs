use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Which bulk orchestrator handles the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BulkUploadType {
    #[serde(rename = "GAR")]
    Gar,
    #[serde(rename = "GLD")]
    Gld,
    #[serde(rename = "GMN")]
    Gmn,
}

impl Display for BulkUploadType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BulkUploadType::Gar => write!(f, "GAR"),
            BulkUploadType::Gld => write!(f, "GLD"),
            BulkUploadType::Gmn => write!(f, "GMN"),
        }
    }
}

impl FromStr for BulkUploadType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GAR" => Ok(BulkUploadType::Gar),
            "GLD" => Ok(BulkUploadType::Gld),
            "GMN" => Ok(BulkUploadType::Gmn),
            _ => Err(anyhow::anyhow!("Invalid bulk upload type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BulkUploadStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "FINISHED")]
    Finished,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "UNFINISHED")]
    Unfinished,
}

impl Display for BulkUploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BulkUploadStatus::Pending => write!(f, "PENDING"),
            BulkUploadStatus::Processing => write!(f, "PROCESSING"),
            BulkUploadStatus::Finished => write!(f, "FINISHED"),
            BulkUploadStatus::Failed => write!(f, "FAILED"),
            BulkUploadStatus::Unfinished => write!(f, "UNFINISHED"),
        }
    }
}

/// A bulk job: one or two tabular files fanned out into UploadTasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpload {
    pub id: Uuid,
    pub data_owner: Uuid,
    pub project_number: String,
    pub bulk_upload_type: BulkUploadType,
    /// Shared metadata copied into every emitted task (qualityRegime,
    /// requestReference, samplingOperator, ...).
    pub metadata: serde_json::Value,
    /// Only used by the GLD variant, which folds the whole file into one
    /// aggregated source document.
    pub sourcedocument_data: serde_json::Value,
    pub status: BulkUploadStatus,
    pub progress: f64,
    pub log: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BulkUpload {
    pub fn new(
        data_owner: Uuid,
        project_number: impl Into<String>,
        bulk_upload_type: BulkUploadType,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        BulkUpload {
            id: Uuid::new_v4(),
            data_owner,
            project_number: project_number.into(),
            bulk_upload_type,
            metadata,
            sourcedocument_data: serde_json::Value::Object(Default::default()),
            status: BulkUploadStatus::Pending,
            progress: 0.0,
            log: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a bulk job. Log lines are appended, not replaced, so
/// per-row failures accumulate.
#[derive(Debug, Clone, Default)]
pub struct BulkUploadPatch {
    pub status: Option<BulkUploadStatus>,
    pub progress: Option<f64>,
    pub append_log: Option<String>,
    pub sourcedocument_data: Option<serde_json::Value>,
}

impl BulkUploadPatch {
    pub fn apply(self, bulk: &mut BulkUpload) {
        if let Some(status) = self.status {
            bulk.status = status;
        }
        if let Some(progress) = self.progress {
            bulk.progress = progress;
        }
        if let Some(line) = self.append_log {
            if !bulk.log.is_empty() {
                bulk.log.push(' ');
            }
            bulk.log.push_str(&line);
        }
        if let Some(data) = self.sourcedocument_data {
            bulk.sourcedocument_data = data;
        }
        bulk.updated_at = Utc::now();
    }
}

/// A stored input file bound to a bulk job. Content access goes through the
/// task store; the extension decides the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFile {
    pub id: Uuid,
    pub bulk_upload_id: Uuid,
    pub filename: String,
}

impl UploadFile {
    pub fn new(bulk_upload_id: Uuid, filename: impl Into<String>) -> Self {
        UploadFile {
            id: Uuid::new_v4(),
            bulk_upload_id,
            filename: filename.into(),
        }
    }

    /// Lower-cased extension: csv, xls, xlsx or zip.
    pub fn extension(&self) -> String {
        self.filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_file_extension() {
        let bulk_id = Uuid::new_v4();
        assert_eq!(UploadFile::new(bulk_id, "veldwerk.CSV").extension(), "csv");
        assert_eq!(UploadFile::new(bulk_id, "lab.xlsx").extension(), "xlsx");
        assert_eq!(UploadFile::new(bulk_id, "metingen.zip").extension(), "zip");
    }

    #[test]
    fn patch_appends_log_lines() {
        let mut bulk = BulkUpload::new(Uuid::new_v4(), "1", BulkUploadType::Gmn, json!({}));
        BulkUploadPatch {
            append_log: Some("FAILED (task a): fout.".to_string()),
            ..Default::default()
        }
        .apply(&mut bulk);
        BulkUploadPatch {
            append_log: Some("FAILED (task b): fout.".to_string()),
            ..Default::default()
        }
        .apply(&mut bulk);

        assert!(bulk.log.contains("task a"));
        assert!(bulk.log.contains("task b"));
    }
}
