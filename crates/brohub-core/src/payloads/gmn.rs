//! Groundwater monitoring network (GMN) source documents.

use serde::{Deserialize, Serialize};

use super::coerce::Scalar;
use super::common::MeasuringPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmnStartRegistration {
    pub object_id_accountable_party: String,
    pub name: String,
    pub delivery_context: String,
    pub monitoring_purpose: String,
    pub groundwater_aspect: String,
    pub start_date_monitoring: String,
    pub measuring_points: Vec<MeasuringPoint>,
}

/// Adds a measuring point to a running network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmnMeasuringPoint {
    pub event_date: String,
    pub measuring_point_code: String,
    pub bro_id: String,
    pub tube_number: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmnMeasuringPointEndDate {
    pub event_date: String,
    pub measuring_point_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bro_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube_number: Option<Scalar>,
}

/// Points an existing measuring point at a different tube.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmnTubeReference {
    pub event_date: String,
    pub measuring_point_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bro_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube_number: Option<Scalar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmnClosure {
    pub end_date_monitoring: String,
}
