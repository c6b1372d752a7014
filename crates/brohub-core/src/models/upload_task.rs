use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// The five BRO registration domains this hub delivers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BroDomain {
    #[serde(rename = "GMN")]
    Gmn,
    #[serde(rename = "GMW")]
    Gmw,
    #[serde(rename = "GLD")]
    Gld,
    #[serde(rename = "GAR")]
    Gar,
    #[serde(rename = "FRD")]
    Frd,
}

impl Display for BroDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BroDomain::Gmn => write!(f, "GMN"),
            BroDomain::Gmw => write!(f, "GMW"),
            BroDomain::Gld => write!(f, "GLD"),
            BroDomain::Gar => write!(f, "GAR"),
            BroDomain::Frd => write!(f, "FRD"),
        }
    }
}

impl FromStr for BroDomain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GMN" => Ok(BroDomain::Gmn),
            "GMW" => Ok(BroDomain::Gmw),
            "GLD" => Ok(BroDomain::Gld),
            "GAR" => Ok(BroDomain::Gar),
            "FRD" => Ok(BroDomain::Frd),
            _ => Err(anyhow::anyhow!("Invalid BRO domain: {}", s)),
        }
    }
}

/// Request kind of a document exchange with the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Registration,
    Replace,
    Insert,
    Move,
    Delete,
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RequestType::Registration => write!(f, "registration"),
            RequestType::Replace => write!(f, "replace"),
            RequestType::Insert => write!(f, "insert"),
            RequestType::Move => write!(f, "move"),
            RequestType::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for RequestType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(RequestType::Registration),
            "replace" => Ok(RequestType::Replace),
            "insert" => Ok(RequestType::Insert),
            "move" => Ok(RequestType::Move),
            "delete" => Ok(RequestType::Delete),
            _ => Err(anyhow::anyhow!("Invalid request type: {}", s)),
        }
    }
}

macro_rules! registration_types {
    ($(($variant:ident, $wire:literal, $domain:ident)),+ $(,)?) => {
        /// The closed, versioned set of document variants the registry accepts.
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum RegistrationType {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl RegistrationType {
            pub fn domain(&self) -> BroDomain {
                match self {
                    $(RegistrationType::$variant => BroDomain::$domain,)+
                }
            }

            pub const ALL: &'static [RegistrationType] = &[
                $(RegistrationType::$variant,)+
            ];
        }

        impl Display for RegistrationType {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                match self {
                    $(RegistrationType::$variant => write!(f, $wire),)+
                }
            }
        }

        impl FromStr for RegistrationType {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(RegistrationType::$variant),)+
                    _ => Err(anyhow::anyhow!("Invalid registration type: {}", s)),
                }
            }
        }
    };
}

registration_types! {
    (GmnStartRegistration, "GMN_StartRegistration", Gmn),
    (GmnMeasuringPoint, "GMN_MeasuringPoint", Gmn),
    (GmnMeasuringPointEndDate, "GMN_MeasuringPointEndDate", Gmn),
    (GmnTubeReference, "GMN_TubeReference", Gmn),
    (GmnClosure, "GMN_Closure", Gmn),
    (GmwConstruction, "GMW_Construction", Gmw),
    (GmwElectrodeStatus, "GMW_ElectrodeStatus", Gmw),
    (GmwGroundLevel, "GMW_GroundLevel", Gmw),
    (GmwGroundLevelMeasuring, "GMW_GroundLevelMeasuring", Gmw),
    (GmwInsertion, "GMW_Insertion", Gmw),
    (GmwLengthening, "GMW_Lengthening", Gmw),
    (GmwShortening, "GMW_Shortening", Gmw),
    (GmwPositions, "GMW_Positions", Gmw),
    (GmwPositionsMeasuring, "GMW_PositionsMeasuring", Gmw),
    (GmwShift, "GMW_Shift", Gmw),
    (GmwMaintainer, "GMW_Maintainer", Gmw),
    (GmwOwner, "GMW_Owner", Gmw),
    (GmwRemoval, "GMW_Removal", Gmw),
    (GmwTubeStatus, "GMW_TubeStatus", Gmw),
    (GmwWellHeadProtector, "GMW_WellHeadProtector", Gmw),
    (Gar, "GAR", Gar),
    (GldStartRegistration, "GLD_StartRegistration", Gld),
    (GldAddition, "GLD_Addition", Gld),
    (GldClosure, "GLD_Closure", Gld),
    (FrdStartRegistration, "FRD_StartRegistration", Frd),
    (FrdGemMeasurementConfiguration, "FRD_GEM_MeasurementConfiguration", Frd),
    (FrdGemMeasurement, "FRD_GEM_Measurement", Frd),
    (FrdEmmInstrumentConfiguration, "FRD_EMM_InstrumentConfiguration", Frd),
    (FrdEmmMeasurement, "FRD_EMM_Measurement", Frd),
    (FrdClosure, "FRD_Closure", Frd),
}

/// Task lifecycle. PENDING and PROCESSING are transient; the rest are terminal
/// for a given run (UNFINISHED tasks can be re-queued manually).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "UNFINISHED")]
    Unfinished,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Unfinished
        )
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Processing => write!(f, "PROCESSING"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::Unfinished => write!(f, "UNFINISHED"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "UNFINISHED" => Ok(TaskStatus::Unfinished),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// One document delivery to the registry: the unit the pipeline processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: Uuid,
    /// Organisation whose credentials sign the delivery.
    pub data_owner: Uuid,
    pub bro_domain: BroDomain,
    pub project_number: String,
    pub registration_type: RegistrationType,
    pub request_type: RequestType,
    /// Free-form metadata map (requestReference, qualityRegime, broId, ...).
    /// Validated when the typed payload is constructed, not before.
    pub metadata: serde_json::Value,
    /// Free-form source-document map in the external camelCase wire form.
    pub sourcedocument_data: serde_json::Value,
    pub status: TaskStatus,
    pub progress: f64,
    pub log: String,
    pub bro_errors: String,
    pub bro_delivery_url: Option<String>,
    pub bro_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadTask {
    pub fn new(
        data_owner: Uuid,
        project_number: impl Into<String>,
        registration_type: RegistrationType,
        request_type: RequestType,
        metadata: serde_json::Value,
        sourcedocument_data: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        UploadTask {
            id: Uuid::new_v4(),
            data_owner,
            bro_domain: registration_type.domain(),
            project_number: project_number.into(),
            registration_type,
            request_type,
            metadata,
            sourcedocument_data,
            status: TaskStatus::Pending,
            progress: 0.0,
            log: String::new(),
            bro_errors: String::new(),
            bro_delivery_url: None,
            bro_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied atomically by the task store. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct UploadTaskPatch {
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub log: Option<String>,
    pub bro_errors: Option<String>,
    pub bro_delivery_url: Option<String>,
    pub bro_id: Option<String>,
    pub request_type: Option<RequestType>,
    pub metadata: Option<serde_json::Value>,
    pub sourcedocument_data: Option<serde_json::Value>,
}

impl UploadTaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        UploadTaskPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(status: TaskStatus, progress: f64, log: impl Into<String>) -> Self {
        UploadTaskPatch {
            status: Some(status),
            progress: Some(progress),
            log: Some(log.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, task: &mut UploadTask) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(log) = self.log {
            task.log = log;
        }
        if let Some(bro_errors) = self.bro_errors {
            task.bro_errors = bro_errors;
        }
        if let Some(url) = self.bro_delivery_url {
            task.bro_delivery_url = Some(url);
        }
        if let Some(bro_id) = self.bro_id {
            task.bro_id = Some(bro_id);
        }
        if let Some(request_type) = self.request_type {
            task.request_type = request_type;
        }
        if let Some(metadata) = self.metadata {
            task.metadata = metadata;
        }
        if let Some(data) = self.sourcedocument_data {
            task.sourcedocument_data = data;
        }
        task.updated_at = Utc::now();
    }
}
