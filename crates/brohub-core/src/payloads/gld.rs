//! Groundwater level dossier (GLD) source documents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coerce::normalize_optional;
use super::common::TimeValuePair;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GldStartRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id_accountable_party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundwater_monitoring_nets: Option<Vec<String>>,
    pub gmw_bro_id: String,
    pub tube_number: super::coerce::Scalar,
}

/// A batch of level measurements appended to a dossier.
///
/// The three `*_id` fields are opaque document-internal references. When the
/// caller does not supply them they are generated as an underscore-prefixed
/// UUID, since XML IDs may not start with a digit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GldAddition {
    pub investigator_kvk: String,
    pub observation_type: String,
    pub evaluation_procedure: String,
    pub measurement_instrument_type: String,
    pub process_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_pressure_compensation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_timeseries_id: Option<String>,
    pub begin_position: String,
    pub end_position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_time: Option<String>,
    pub time_value_pairs: Vec<TimeValuePair>,
}

/// Instrument types that actually measure air pressure. Any other instrument
/// cannot carry a compensation type.
const PRESSURE_SENSOR_TYPES: [&str; 2] = ["druksensor", "stereoDruksensor"];

fn opaque_id() -> String {
    format!("_{}", Uuid::new_v4())
}

impl GldAddition {
    /// Applies the cross-field rules the registry schema implies but does
    /// not spell out. Run once after deserialization.
    pub fn normalize(&mut self) {
        if self.observation_id.is_none() {
            self.observation_id = Some(opaque_id());
        }
        if self.observation_process_id.is_none() {
            self.observation_process_id = Some(opaque_id());
        }
        if self.measurement_timeseries_id.is_none() {
            self.measurement_timeseries_id = Some(opaque_id());
        }

        normalize_optional(&mut self.air_pressure_compensation_type);
        if !PRESSURE_SENSOR_TYPES.contains(&self.measurement_instrument_type.as_str()) {
            self.air_pressure_compensation_type = None;
        }

        match self.observation_type.as_str() {
            // Control measurements are never assessed.
            "controlemeting" => self.validation_status = None,
            "reguliereMeting" if self.validation_status.is_none() => {
                self.validation_status = Some("onbekend".to_string());
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GldClosure {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addition(observation_type: &str, instrument: &str, air: Option<&str>) -> GldAddition {
        let mut value = json!({
            "investigatorKvk": "12345678",
            "observationType": observation_type,
            "evaluationProcedure": "oordeelDeskundige",
            "measurementInstrumentType": instrument,
            "processReference": "NEN5120v1991",
            "beginPosition": "2024-01-01T00:00:00",
            "endPosition": "2024-01-02T00:00:00",
            "timeValuePairs": [{"time": "2024-01-01T12:00:00", "value": 10.0}],
        });
        if let Some(air) = air {
            value["airPressureCompensationType"] = json!(air);
        }
        let mut doc: GldAddition = serde_json::from_value(value).unwrap();
        doc.normalize();
        doc
    }

    #[test]
    fn generates_underscore_prefixed_ids() {
        let doc = addition("reguliereMeting", "druksensor", None);
        for id in [
            doc.observation_id.as_deref().unwrap(),
            doc.observation_process_id.as_deref().unwrap(),
            doc.measurement_timeseries_id.as_deref().unwrap(),
        ] {
            assert!(id.starts_with('_'));
            Uuid::parse_str(&id[1..]).unwrap();
        }
    }

    #[test]
    fn air_pressure_compensation_requires_pressure_sensor() {
        let doc = addition("reguliereMeting", "analoogPeilklokje", Some("monitoringsnetmeting"));
        assert!(doc.air_pressure_compensation_type.is_none());

        let doc = addition("reguliereMeting", "druksensor", Some("monitoringsnetmeting"));
        assert_eq!(
            doc.air_pressure_compensation_type.as_deref(),
            Some("monitoringsnetmeting")
        );
    }

    #[test]
    fn placeholder_air_pressure_values_are_dropped() {
        let doc = addition("reguliereMeting", "druksensor", Some("None"));
        assert!(doc.air_pressure_compensation_type.is_none());
    }

    #[test]
    fn regular_measurement_defaults_validation_status() {
        let doc = addition("reguliereMeting", "druksensor", None);
        assert_eq!(doc.validation_status.as_deref(), Some("onbekend"));
    }

    #[test]
    fn control_measurement_never_carries_validation_status() {
        let mut doc = addition("controlemeting", "druksensor", None);
        doc.validation_status = Some("volledigBeoordeeld".to_string());
        doc.normalize();
        assert!(doc.validation_status.is_none());
    }
}
