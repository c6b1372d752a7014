//! Building blocks shared by several document variants.
//!
//! Field names follow the registry catalogue. Wire form is camelCase; the
//! internal form is snake_case, mapped per field through serde renames.

use serde::{Deserialize, Serialize};

use super::coerce::{onbekend, Scalar};

/// The metadata block every request carries, rendered ahead of the source
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub request_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_accountable_party: Option<String>,
    pub quality_regime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bro_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub under_privilege: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuringPoint {
    pub measuring_point_code: String,
    pub bro_id: String,
    pub tube_number: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Electrode {
    pub electrode_number: Scalar,
    pub electrode_packing_material: String,
    pub electrode_status: String,
    pub electrode_position: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoOhmCable {
    pub cable_number: Scalar,
    pub electrodes: Vec<Electrode>,
}

/// Full tube description as delivered with a well construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringTube {
    pub tube_number: Scalar,
    pub tube_type: String,
    pub artesian_well_cap_present: String,
    pub sediment_sump_present: String,
    pub number_of_geo_ohm_cables: Scalar,
    pub tube_top_diameter: Scalar,
    pub variable_diameter: Scalar,
    pub tube_status: String,
    pub tube_top_position: Scalar,
    pub tube_top_positioning_method: String,
    pub tube_packing_material: String,
    pub tube_material: String,
    pub glue: String,
    pub screen_length: Scalar,
    pub sock_material: String,
    pub plain_tube_part_length: Scalar,
    pub sediment_sump_length: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoohmcables: Option<Vec<GeoOhmCable>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeasurement {
    pub parameter: Scalar,
    pub unit: String,
    pub field_measurement_value: Scalar,
    pub quality_control_status: String,
}

/// Field observations made while sampling. The Dutch status columns default
/// to "onbekend" when the spreadsheet leaves them blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResearch {
    pub sampling_date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_standard: Option<String>,
    pub sampling_operator: String,
    pub pump_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour_strength: Option<String>,
    #[serde(default = "onbekend")]
    pub abnormality_in_cooling: String,
    #[serde(default = "onbekend")]
    pub abnormality_in_device: String,
    #[serde(default = "onbekend")]
    pub polluted_by_engine: String,
    #[serde(default = "onbekend")]
    pub filter_aerated: String,
    #[serde(default = "onbekend")]
    pub ground_water_level_dropped_too_much: String,
    #[serde(default = "onbekend")]
    pub abnormal_filter: String,
    #[serde(default = "onbekend")]
    pub sample_aerated: String,
    #[serde(default = "onbekend")]
    pub hose_reused: String,
    #[serde(default = "onbekend")]
    pub temperature_difficult_to_measure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_measurements: Option<Vec<FieldMeasurement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub parameter: Scalar,
    pub unit: String,
    pub analysis_measurement_value: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_limit: Option<Scalar>,
    pub quality_control_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProcess {
    pub date: String,
    pub analytical_technique: String,
    pub valuation_method: String,
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaboratoryAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_laboratory_kvk: Option<String>,
    pub analysis_processes: Vec<AnalysisProcess>,
}

/// One groundwater level measurement in a time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeValuePair {
    pub time: String,
    pub value: Scalar,
    #[serde(default = "onbekend")]
    pub status_quality_control: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub censor_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub censoring_limitvalue: Option<Scalar>,
}
