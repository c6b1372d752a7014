//! Formation resistance dossier (FRD) source documents, covering both the
//! geo-electrical (GEM) and electromagnetic (EMM) measurement tracks.

use serde::{Deserialize, Serialize};

use super::coerce::Scalar;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdStartRegistration {
    pub object_id_accountable_party: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundwater_monitoring_nets: Option<Vec<String>>,
    pub gmw_bro_id: String,
    pub tube_number: Scalar,
}

/// One electrode pair setup used during a geo-electrical measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementConfiguration {
    pub measurement_configuration_id: String,
    pub measurement_e1_cable_number: Scalar,
    pub measurement_e1_electrode_number: Scalar,
    pub measurement_e2_cable_number: Scalar,
    pub measurement_e2_electrode_number: Scalar,
    pub current_e1_cable_number: Scalar,
    pub current_e1_electrode_number: Scalar,
    pub current_e2_cable_number: Scalar,
    pub current_e2_electrode_number: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdGemMeasurementConfiguration {
    pub measurement_configurations: Vec<MeasurementConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdMeasurement {
    pub value: Scalar,
    pub unit: String,
    /// References a configuration id registered earlier in the dossier.
    pub configuration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdGemMeasurement {
    pub measurement_date: String,
    pub measurement_operator_kvk: String,
    pub determination_procedure: String,
    pub evaluation_procedure: String,
    pub measurements: Vec<FrdMeasurement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdEmmInstrumentConfiguration {
    pub instrument_configuration_id: String,
    pub relative_position_transmitter_coil: Scalar,
    pub relative_position_primary_receiver_coil: Scalar,
    pub secondary_receiver_coil_available: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_position_secondary_receiver_coil: Option<Scalar>,
    pub coil_frequency_known: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coil_frequency: Option<Scalar>,
    pub instrument_length: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdEmmMeasurement {
    pub measurement_date: String,
    pub measurement_operator_kvk: String,
    pub determination_procedure: String,
    pub evaluation_procedure: String,
    pub measurements: Vec<FrdMeasurement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrdClosure {}
