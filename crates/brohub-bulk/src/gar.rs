//! Bulk GAR orchestrator: one fieldwork spreadsheet plus an optional lab
//! spreadsheet fan out into one upload task per sampled tube.
//!
//! Fieldwork and lab rows are joined on well, date and tube number, so only
//! combinations present in both files yield a report. Rows that cannot be
//! turned into a valid source document are logged and skipped; the job still
//! finishes.

use std::time::Duration;

use brohub_core::models::{
    BulkUpload, BulkUploadPatch, BulkUploadStatus, RegistrationType, RequestType, UploadFile,
    UploadTask,
};
use brohub_core::payloads::gar::Gar;
use brohub_core::payloads::{
    Analysis, AnalysisProcess, FieldMeasurement, FieldResearch, LaboratoryAnalysis, Scalar,
};
use brohub_core::{AppError, Config};
use brohub_store::TaskStore;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::table::{excel_serial_to_date, Row, Table};

const REQUIRED_COLUMNS: [&str; 3] = ["GMW BRO ID", "Datum bemonsterd", "Filternummer"];

/// Administrative spreadsheet columns that never belong in a source document.
const EXCLUDED_COLUMN_SUBSTRINGS: [&str; 7] = [
    "NITG",
    "Putcode",
    "coördinaat",
    "Bijzonderheden",
    "MeetpuntId",
    "Projectcode lab",
    "Monsternummer lab",
];

struct FieldParameter {
    column: &'static str,
    parameter_id: i64,
    unit: &'static str,
}

/// Aquo parameter codes for the supported field measurement columns.
const FIELD_PARAMETERS: [FieldParameter; 6] = [
    FieldParameter { column: "pH", parameter_id: 1398, unit: "1" },
    FieldParameter { column: "Zuurstof (mg/l)", parameter_id: 1701, unit: "mg/l" },
    FieldParameter { column: "Geleidbaarheid (mS/m)", parameter_id: 3548, unit: "mS/m" },
    FieldParameter { column: "Temperatuur (°C)", parameter_id: 1522, unit: "Cel" },
    FieldParameter { column: "Troebelheid (NTU)", parameter_id: 2031, unit: "[NTU]" },
    FieldParameter { column: "Alkaliniteit (HCO3 - mg/l)", parameter_id: 374, unit: "mg/l" },
];

struct LabParameter {
    name: &'static str,
    parameter_id: i64,
    unit: &'static str,
    valuation_method: &'static str,
    analytical_technique: &'static str,
}

/// Supported lab parameters. The spreadsheet carries them as
/// `"<naam> (<eenheid>)"` columns with matching Rapportagegrens and
/// Analysedatum columns.
const LAB_PARAMETERS: [LabParameter; 3] = [
    LabParameter {
        name: "FRD-903",
        parameter_id: 5741,
        unit: "ug/l",
        valuation_method: "I21675.19",
        analytical_technique: "LC-MS-MS",
    },
    LabParameter {
        name: "134DClFy3C1y",
        parameter_id: 2817,
        unit: "ug/l",
        valuation_method: "D38407-36.14",
        analytical_technique: "LC-MS-MS",
    },
    LabParameter {
        name: "HCO3",
        parameter_id: 347,
        unit: "mg/l",
        valuation_method: "I9963-1.96",
        analytical_technique: "POTM_TITM",
    },
];

pub struct GarBulkUploader<'a, S: TaskStore> {
    store: &'a S,
    emission_delay: Duration,
}

impl<'a, S: TaskStore> GarBulkUploader<'a, S> {
    pub fn new(store: &'a S, config: &Config) -> Self {
        GarBulkUploader {
            store,
            emission_delay: Duration::from_secs(config.bulk_emission_delay_secs),
        }
    }

    pub fn with_emission_delay(mut self, delay: Duration) -> Self {
        self.emission_delay = delay;
        self
    }

    /// Runs the whole job. The caller has already claimed the bulk record
    /// (PENDING to PROCESSING); errors in the input end the job as FAILED
    /// rather than bubbling up.
    pub async fn process(&self, bulk_id: Uuid) -> Result<(), AppError> {
        let bulk = self.store.load_bulk_upload(bulk_id).await?;
        let files = self.store.upload_files_for_bulk(bulk_id).await?;

        let (fieldwork, lab) = match self.load_tables(&files).await {
            Ok(tables) => tables,
            Err(e) => {
                return self
                    .fail(bulk_id, None, format!("Failed to open the files: {}", e))
                    .await;
            }
        };
        self.set_progress(bulk_id, 10.0).await?;

        let (merged, has_lab) = match combine_tables(fieldwork, lab) {
            Ok(result) => result,
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
        info!(bulk = %bulk_id, rows = merged.len(), has_lab, "prepared merged GAR table");

        let task_metadata = match task_metadata(&bulk) {
            Ok(metadata) => metadata,
            Err(e) => {
                return self
                    .fail(bulk_id, Some(20.0), format!("Incomplete metadata: {}", e))
                    .await;
            }
        };

        let per_row = ((80.0 / merged.len() as f64) * 100.0).round() / 100.0;
        let mut progress = 20.0;
        for (index, row) in merged.rows().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.emission_delay).await;
            }
            match build_task(&bulk, row, &task_metadata, has_lab) {
                Ok(task) => self.store.insert_upload_task(task).await?,
                Err(e) => {
                    let label = row.get("bro_id").unwrap_or("?");
                    warn!(bulk = %bulk_id, bro_id = label, "skipping GAR row: {}", e);
                    self.store
                        .update_bulk_upload(
                            bulk_id,
                            BulkUploadPatch {
                                append_log: Some(format!("Rij {} overgeslagen: {}.", label, e)),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
            }
            progress += per_row;
            self.set_progress(bulk_id, progress).await?;
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

    /// A filename containing "lab" marks the lab file; the first remaining
    /// file is the fieldwork file.
    async fn load_tables(
        &self,
        files: &[UploadFile],
    ) -> Result<(Option<Table>, Option<Table>), AppError> {
        let lab_file = files
            .iter()
            .find(|file| file.filename.to_lowercase().contains("lab"));
        let fieldwork_file = files
            .iter()
            .find(|file| lab_file.map(|lab| lab.id) != Some(file.id));

        let mut fieldwork = None;
        if let Some(file) = fieldwork_file {
            let (_, content) = self.store.load_upload_file(file.id).await?;
            fieldwork = Some(Table::from_bytes(&file.extension(), &content)?);
        }
        let mut lab = None;
        if let Some(file) = lab_file {
            let (_, content) = self.store.load_upload_file(file.id).await?;
            lab = Some(Table::from_bytes(&file.extension(), &content)?);
        }
        Ok((fieldwork, lab))
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

/// Joins fieldwork and lab rows when both files carry the key columns.
/// A missing lab file gives a fieldwork-only report; a fieldwork file
/// without the key columns falls back to the lab file alone.
fn combine_tables(
    fieldwork: Option<Table>,
    lab: Option<Table>,
) -> Result<(Table, bool), AppError> {
    let mut has_lab = true;
    let mut merged = match (&fieldwork, &lab) {
        (Some(field), Some(lab))
            if field.has_columns(&REQUIRED_COLUMNS) && lab.has_columns(&REQUIRED_COLUMNS) =>
        {
            field.inner_join(lab, &REQUIRED_COLUMNS)?
        }
        (Some(field), _) if field.has_columns(&REQUIRED_COLUMNS) => {
            has_lab = false;
            field.clone()
        }
        (_, Some(lab)) => lab.clone(),
        _ => {
            return Err(AppError::Internal(
                "No usable fieldwork or lab file was supplied".to_string(),
            ))
        }
    };

    merged.rename(&[
        ("GMW BRO ID", "bro_id"),
        ("Datum bemonsterd", "date"),
        ("Filternummer", "filter_num"),
    ]);
    merged.drop_columns_containing(&EXCLUDED_COLUMN_SUBSTRINGS);

    if merged.is_empty() {
        return Err(AppError::Internal(
            "The combination of the lab and field files gave no resulting possible GARs"
                .to_string(),
        ));
    }
    Ok((merged, has_lab))
}

/// Metadata copied onto every emitted task.
fn task_metadata(bulk: &BulkUpload) -> Result<Value, AppError> {
    let mut metadata = json!({
        "qualityRegime": metadata_str(&bulk.metadata, "qualityRegime")?,
        "requestReference": metadata_str(&bulk.metadata, "requestReference")?,
    });
    if let Some(party) = metadata_opt(&bulk.metadata, "deliveryAccountableParty") {
        metadata["deliveryAccountableParty"] = Value::String(party);
    }
    Ok(metadata)
}

fn build_task(
    bulk: &BulkUpload,
    row: Row<'_>,
    task_metadata: &Value,
    has_lab: bool,
) -> Result<UploadTask, AppError> {
    let bro_id = required_cell(row, "bro_id")?;
    let date = parse_date(required_cell(row, "date")?)?;
    let tube_number = required_cell(row, "filter_num")?;
    let tube_index: i64 = Scalar::from(tube_number)
        .as_f64()
        .map(|v| v as i64)
        .ok_or_else(|| AppError::invalid_payload("filter_num", "Not a number"))?;

    let document = Gar {
        object_id_accountable_party: format!("{}-{:03}-{}", bro_id, tube_index, date.year()),
        quality_control_method: metadata_str(&bulk.metadata, "qualityControlMethod")?,
        groundwater_monitoring_nets: bulk
            .metadata
            .get("groundwaterMonitoringNets")
            .and_then(|nets| serde_json::from_value(nets.clone()).ok()),
        gmw_bro_id: bro_id.to_string(),
        tube_number: Scalar::Int(tube_index),
        field_research: field_research(row, &bulk.metadata, date)?,
        laboratory_analyses: if has_lab {
            Some(laboratory_analyses(row, &bulk.metadata)?)
        } else {
            None
        },
    };

    Ok(UploadTask::new(
        bulk.data_owner,
        &bulk.project_number,
        RegistrationType::Gar,
        RequestType::Registration,
        task_metadata.clone(),
        serde_json::to_value(&document)?,
    ))
}

fn field_research(
    row: Row<'_>,
    metadata: &Value,
    date: NaiveDate,
) -> Result<FieldResearch, AppError> {
    let time = row
        .get("Tijd bemonsterd")
        .and_then(normalize_sampling_time)
        .unwrap_or_else(|| "12:00".to_string());
    let item = |name: &str| {
        row.get(name)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| "onbekend".to_string())
    };

    Ok(FieldResearch {
        sampling_date_time: format!("{}T{}:00+00:00", date.format("%Y-%m-%d"), time),
        sampling_standard: Some(metadata_str(metadata, "samplingStandard")?),
        sampling_operator: metadata_str(metadata, "samplingOperator")?,
        pump_type: decapitalize(&item("Pomptype")),
        primary_colour: Some(item("Hoofdkleur")),
        secondary_colour: Some(item("Bijkleur")),
        colour_strength: Some(item("Kleursterkte")),
        abnormality_in_cooling: item("Afwijkend gekoeld"),
        abnormality_in_device: item("Afwijking in meetapparatuur"),
        polluted_by_engine: item("Contaminatie door verbrandingsmotor"),
        filter_aerated: item("Filter belucht/ drooggevallen"),
        ground_water_level_dropped_too_much: item("Grondwaterstand > 50 cm verlaagd"),
        abnormal_filter: item("Inline filter afwijkend"),
        sample_aerated: item("Monster belucht"),
        hose_reused: item("Slang hergebruikt"),
        temperature_difficult_to_measure: item("Temperatuur moeilijk te bepalen"),
        field_measurements: Some(field_measurements(row)),
    })
}

/// The value "niet bepaald" marks a parameter the sampler skipped.
fn field_measurements(row: Row<'_>) -> Vec<FieldMeasurement> {
    FIELD_PARAMETERS
        .iter()
        .filter_map(|parameter| {
            let value = row.get(parameter.column)?;
            if value == "niet bepaald" {
                return None;
            }
            Some(FieldMeasurement {
                parameter: Scalar::Int(parameter.parameter_id),
                unit: parameter.unit.to_string(),
                field_measurement_value: cell_scalar(value),
                quality_control_status: "onbeslist".to_string(),
            })
        })
        .collect()
}

fn laboratory_analyses(
    row: Row<'_>,
    metadata: &Value,
) -> Result<Vec<LaboratoryAnalysis>, AppError> {
    let mut processes = Vec::new();
    for parameter in &LAB_PARAMETERS {
        let value_column = column_regex("", parameter.name)?;
        let Some(value) = row.find(|column| value_column.is_match(column)) else {
            continue;
        };

        let limit_column = column_regex("Rapportagegrens", parameter.name)?;
        let date_column = column_regex("Analysedatum", parameter.name)?;
        let date = row
            .find(|column| date_column.is_match(column))
            .ok_or_else(|| {
                AppError::invalid_payload(
                    format!("Analysedatum {}", parameter.name),
                    "Field required",
                )
            })?;

        processes.push(AnalysisProcess {
            date: date.to_string(),
            analytical_technique: parameter.analytical_technique.to_string(),
            valuation_method: parameter.valuation_method.to_string(),
            analyses: vec![Analysis {
                parameter: Scalar::Int(parameter.parameter_id),
                unit: parameter.unit.to_string(),
                analysis_measurement_value: cell_scalar(value),
                limit_symbol: None,
                reporting_limit: row
                    .find(|column| limit_column.is_match(column))
                    .map(cell_scalar),
                quality_control_status: "onbeslist".to_string(),
            }],
        });
    }

    Ok(vec![LaboratoryAnalysis {
        responsible_laboratory_kvk: metadata_opt(metadata, "responsibleLaboratoryKvk"),
        analysis_processes: processes,
    }])
}

/// Lab columns look like `"HCO3 (mg/l)"`, optionally prefixed with
/// Rapportagegrens or Analysedatum.
fn column_regex(prefix: &str, name: &str) -> Result<Regex, AppError> {
    let pattern = if prefix.is_empty() {
        format!(r"^\s*{}\s+\(.*\)\s*$", regex::escape(name))
    } else {
        format!(r"^\s*{}\s+{}\s+\(.*\)\s*$", prefix, regex::escape(name))
    };
    Regex::new(&pattern).map_err(|e| AppError::Internal(format!("Bad column pattern: {}", e)))
}

/// Accepts HH:MM or H:MM and zero-pads the hour. Invalid input falls back to
/// the caller's default.
fn normalize_sampling_time(raw: &str) -> Option<String> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(format!("{:02}:{:02}", hours, minutes))
}

/// The registry's pump type codes start lowercase; spreadsheets often don't.
fn decapitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(excel_serial_to_date))
        .ok_or_else(|| AppError::invalid_payload("date", format!("Invalid date: {}", raw)))
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

fn required_cell<'a>(row: Row<'a>, column: &str) -> Result<&'a str, AppError> {
    row.get(column)
        .ok_or_else(|| AppError::invalid_payload(column, "Field required"))
}

fn metadata_str(metadata: &Value, key: &str) -> Result<String, AppError> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::invalid_payload(key, "Field required"))
}

fn metadata_opt(metadata: &Value, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}
