//! Typed source documents.
//!
//! Each registration type maps to exactly one document shape. Tasks store
//! their payload as free-form JSON; this module is the gate where that JSON
//! becomes typed, defaults are applied, and cross-field rules run. Nothing
//! untyped reaches the XML renderer.

pub mod coerce;
pub mod common;
pub mod frd;
pub mod gar;
pub mod gld;
pub mod gmn;
pub mod gmw;

pub use coerce::Scalar;
pub use common::{
    Analysis, AnalysisProcess, Electrode, FieldMeasurement, FieldResearch, GeoOhmCable,
    LaboratoryAnalysis, MeasuringPoint, Metadata, MonitoringTube, TimeValuePair,
};

use crate::models::RegistrationType;
use crate::AppError;

use frd::{
    FrdClosure, FrdEmmInstrumentConfiguration, FrdEmmMeasurement, FrdGemMeasurement,
    FrdGemMeasurementConfiguration, FrdStartRegistration,
};
use gar::Gar;
use gld::{GldAddition, GldClosure, GldStartRegistration};
use gmn::{
    GmnClosure, GmnMeasuringPoint, GmnMeasuringPointEndDate, GmnStartRegistration,
    GmnTubeReference,
};
use gmw::{
    GmwConstruction, GmwElectrodeStatus, GmwGroundLevel, GmwGroundLevelMeasuring, GmwInsertion,
    GmwLengthening, GmwMaintainer, GmwOwner, GmwPositions, GmwPositionsMeasuring, GmwRemoval,
    GmwShift, GmwShortening, GmwTubeStatus, GmwWellHeadProtector,
};

/// Closed union over every document shape the hub can deliver.
#[derive(Debug, Clone)]
pub enum SourceDocument {
    GmnStartRegistration(GmnStartRegistration),
    GmnMeasuringPoint(GmnMeasuringPoint),
    GmnMeasuringPointEndDate(GmnMeasuringPointEndDate),
    GmnTubeReference(GmnTubeReference),
    GmnClosure(GmnClosure),
    GmwConstruction(GmwConstruction),
    GmwElectrodeStatus(GmwElectrodeStatus),
    GmwGroundLevel(GmwGroundLevel),
    GmwGroundLevelMeasuring(GmwGroundLevelMeasuring),
    GmwInsertion(GmwInsertion),
    GmwLengthening(GmwLengthening),
    GmwShortening(GmwShortening),
    GmwPositions(GmwPositions),
    GmwPositionsMeasuring(GmwPositionsMeasuring),
    GmwShift(GmwShift),
    GmwMaintainer(GmwMaintainer),
    GmwOwner(GmwOwner),
    GmwRemoval(GmwRemoval),
    GmwTubeStatus(GmwTubeStatus),
    GmwWellHeadProtector(GmwWellHeadProtector),
    Gar(Gar),
    GldStartRegistration(GldStartRegistration),
    GldAddition(GldAddition),
    GldClosure(GldClosure),
    FrdStartRegistration(FrdStartRegistration),
    FrdGemMeasurementConfiguration(FrdGemMeasurementConfiguration),
    FrdGemMeasurement(FrdGemMeasurement),
    FrdEmmInstrumentConfiguration(FrdEmmInstrumentConfiguration),
    FrdEmmMeasurement(FrdEmmMeasurement),
    FrdClosure(FrdClosure),
}

fn parse<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(value.clone()).map_err(|err| invalid_payload_from(&err))
}

/// Turns a serde error into a field-addressed payload error. Serde reports a
/// missing field as "missing field `name`"; we lift that name out so the task
/// log points at the column the user has to fix.
fn invalid_payload_from(err: &serde_json::Error) -> AppError {
    let message = err.to_string();
    let field_path = message
        .split_once("field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "sourcedocument_data".to_string());
    AppError::InvalidPayload {
        field_path,
        reason: message,
    }
}

impl SourceDocument {
    /// Builds the typed document for a registration type, applying defaults
    /// and cross-field rules. This is the only constructor.
    pub fn from_value(
        registration_type: RegistrationType,
        value: &serde_json::Value,
    ) -> Result<Self, AppError> {
        use RegistrationType as R;
        let doc = match registration_type {
            R::GmnStartRegistration => SourceDocument::GmnStartRegistration(parse(value)?),
            R::GmnMeasuringPoint => SourceDocument::GmnMeasuringPoint(parse(value)?),
            R::GmnMeasuringPointEndDate => SourceDocument::GmnMeasuringPointEndDate(parse(value)?),
            R::GmnTubeReference => SourceDocument::GmnTubeReference(parse(value)?),
            R::GmnClosure => SourceDocument::GmnClosure(parse(value)?),
            R::GmwConstruction => SourceDocument::GmwConstruction(parse(value)?),
            R::GmwElectrodeStatus => SourceDocument::GmwElectrodeStatus(parse(value)?),
            R::GmwGroundLevel => SourceDocument::GmwGroundLevel(parse(value)?),
            R::GmwGroundLevelMeasuring => SourceDocument::GmwGroundLevelMeasuring(parse(value)?),
            R::GmwInsertion => SourceDocument::GmwInsertion(parse(value)?),
            R::GmwLengthening => SourceDocument::GmwLengthening(parse(value)?),
            R::GmwShortening => SourceDocument::GmwShortening(parse(value)?),
            R::GmwPositions => SourceDocument::GmwPositions(parse(value)?),
            R::GmwPositionsMeasuring => SourceDocument::GmwPositionsMeasuring(parse(value)?),
            R::GmwShift => SourceDocument::GmwShift(parse(value)?),
            R::GmwMaintainer => SourceDocument::GmwMaintainer(parse(value)?),
            R::GmwOwner => SourceDocument::GmwOwner(parse(value)?),
            R::GmwRemoval => SourceDocument::GmwRemoval(parse(value)?),
            R::GmwTubeStatus => SourceDocument::GmwTubeStatus(parse(value)?),
            R::GmwWellHeadProtector => SourceDocument::GmwWellHeadProtector(parse(value)?),
            R::Gar => SourceDocument::Gar(parse(value)?),
            R::GldStartRegistration => SourceDocument::GldStartRegistration(parse(value)?),
            R::GldAddition => {
                let mut doc: GldAddition = parse(value)?;
                doc.normalize();
                SourceDocument::GldAddition(doc)
            }
            R::GldClosure => SourceDocument::GldClosure(parse(value)?),
            R::FrdStartRegistration => SourceDocument::FrdStartRegistration(parse(value)?),
            R::FrdGemMeasurementConfiguration => {
                SourceDocument::FrdGemMeasurementConfiguration(parse(value)?)
            }
            R::FrdGemMeasurement => SourceDocument::FrdGemMeasurement(parse(value)?),
            R::FrdEmmInstrumentConfiguration => {
                SourceDocument::FrdEmmInstrumentConfiguration(parse(value)?)
            }
            R::FrdEmmMeasurement => SourceDocument::FrdEmmMeasurement(parse(value)?),
            R::FrdClosure => SourceDocument::FrdClosure(parse(value)?),
        };
        Ok(doc)
    }

    /// Serialized camelCase form as stored on the task record.
    pub fn to_value(&self) -> Result<serde_json::Value, AppError> {
        use SourceDocument as S;
        let value = match self {
            S::GmnStartRegistration(doc) => serde_json::to_value(doc),
            S::GmnMeasuringPoint(doc) => serde_json::to_value(doc),
            S::GmnMeasuringPointEndDate(doc) => serde_json::to_value(doc),
            S::GmnTubeReference(doc) => serde_json::to_value(doc),
            S::GmnClosure(doc) => serde_json::to_value(doc),
            S::GmwConstruction(doc) => serde_json::to_value(doc),
            S::GmwElectrodeStatus(doc) => serde_json::to_value(doc),
            S::GmwGroundLevel(doc) => serde_json::to_value(doc),
            S::GmwGroundLevelMeasuring(doc) => serde_json::to_value(doc),
            S::GmwInsertion(doc) => serde_json::to_value(doc),
            S::GmwLengthening(doc) => serde_json::to_value(doc),
            S::GmwShortening(doc) => serde_json::to_value(doc),
            S::GmwPositions(doc) => serde_json::to_value(doc),
            S::GmwPositionsMeasuring(doc) => serde_json::to_value(doc),
            S::GmwShift(doc) => serde_json::to_value(doc),
            S::GmwMaintainer(doc) => serde_json::to_value(doc),
            S::GmwOwner(doc) => serde_json::to_value(doc),
            S::GmwRemoval(doc) => serde_json::to_value(doc),
            S::GmwTubeStatus(doc) => serde_json::to_value(doc),
            S::GmwWellHeadProtector(doc) => serde_json::to_value(doc),
            S::Gar(doc) => serde_json::to_value(doc),
            S::GldStartRegistration(doc) => serde_json::to_value(doc),
            S::GldAddition(doc) => serde_json::to_value(doc),
            S::GldClosure(doc) => serde_json::to_value(doc),
            S::FrdStartRegistration(doc) => serde_json::to_value(doc),
            S::FrdGemMeasurementConfiguration(doc) => serde_json::to_value(doc),
            S::FrdGemMeasurement(doc) => serde_json::to_value(doc),
            S::FrdEmmInstrumentConfiguration(doc) => serde_json::to_value(doc),
            S::FrdEmmMeasurement(doc) => serde_json::to_value(doc),
            S::FrdClosure(doc) => serde_json::to_value(doc),
        };
        value.map_err(AppError::from)
    }
}

/// Parses the metadata block stored alongside a task.
pub fn metadata_from_value(value: &serde_json::Value) -> Result<Metadata, AppError> {
    parse(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_field_names_the_field() {
        let err = SourceDocument::from_value(
            RegistrationType::GmnClosure,
            &json!({"wrongKey": "2024-01-01"}),
        )
        .unwrap_err();
        match err {
            AppError::InvalidPayload { field_path, .. } => {
                assert_eq!(field_path, "endDateMonitoring");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_do_not_round_trip() {
        let doc = SourceDocument::from_value(
            RegistrationType::GmwOwner,
            &json!({
                "eventDate": "2024-01-01",
                "owner": "27376655",
                "kolomZonderBetekenis": "x",
            }),
        )
        .unwrap();
        let wire = doc.to_value().unwrap();
        assert!(wire.get("kolomZonderBetekenis").is_none());
        assert_eq!(wire["owner"], "27376655");
    }

    #[test]
    fn gld_addition_is_normalized_on_construction() {
        let doc = SourceDocument::from_value(
            RegistrationType::GldAddition,
            &json!({
                "investigatorKvk": "12345678",
                "observationType": "reguliereMeting",
                "evaluationProcedure": "oordeelDeskundige",
                "measurementInstrumentType": "druksensor",
                "processReference": "NEN5120v1991",
                "beginPosition": "2024-01-01T00:00:00",
                "endPosition": "2024-01-02T00:00:00",
                "timeValuePairs": [{"time": "2024-01-01T12:00:00", "value": 10.0}],
            }),
        )
        .unwrap();
        match doc {
            SourceDocument::GldAddition(addition) => {
                assert!(addition.observation_id.is_some());
                assert_eq!(addition.validation_status.as_deref(), Some("onbekend"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn every_registration_type_has_a_shape() {
        // An empty object fails required-field checks but must never hit an
        // unsupported-combination path.
        for registration_type in RegistrationType::ALL {
            match SourceDocument::from_value(*registration_type, &json!({})) {
                Ok(_) | Err(AppError::InvalidPayload { .. }) => {}
                Err(other) => panic!("{registration_type}: unexpected error {other:?}"),
            }
        }
    }
}
