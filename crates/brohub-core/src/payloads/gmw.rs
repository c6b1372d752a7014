//! Groundwater monitoring well (GMW) source documents: the full construction
//! document plus the intermediate events that amend a registered well.

use serde::{Deserialize, Serialize};

use super::coerce::Scalar;
use super::common::MonitoringTube;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwConstruction {
    pub object_id_accountable_party: String,
    pub delivery_context: String,
    pub construction_standard: String,
    pub initial_function: String,
    pub number_of_monitoring_tubes: Scalar,
    pub ground_level_stable: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_responsible_party: Option<String>,
    pub well_head_protector: String,
    pub well_construction_date: String,
    pub delivered_location: String,
    pub horizontal_positioning_method: String,
    pub local_vertical_reference_point: String,
    pub offset: Scalar,
    pub vertical_datum: String,
    pub ground_level_position: Scalar,
    pub ground_level_positioning_method: String,
    pub monitoring_tubes: Vec<MonitoringTube>,
}

/// Tube fields that change when a well is lengthened or shortened. The
/// plain tube part length may be filled in later from well geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringTubeLengthening {
    pub tube_number: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_diameter: Option<Scalar>,
    pub tube_top_position: Scalar,
    pub tube_top_positioning_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_tube_part_length: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube_material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwLengthening {
    pub event_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_head_protector: Option<String>,
    pub monitoring_tubes: Vec<MonitoringTubeLengthening>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwShortening {
    pub event_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_head_protector: Option<String>,
    pub monitoring_tubes: Vec<MonitoringTubeLengthening>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwGroundLevel {
    pub event_date: String,
    pub ground_level_position: Scalar,
    pub ground_level_positioning_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwGroundLevelMeasuring {
    pub event_date: String,
    pub ground_level_position: Scalar,
    pub ground_level_positioning_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwInsertion {
    pub event_date: String,
    pub tube_number: Scalar,
    pub tube_top_position: Scalar,
    pub tube_top_positioning_method: String,
    pub inserted_part_length: Scalar,
    pub inserted_part_diameter: Scalar,
    pub inserted_part_material: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringTubePositions {
    pub tube_number: Scalar,
    pub tube_top_position: Scalar,
    pub tube_top_positioning_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwPositions {
    pub event_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_level_position: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_level_positioning_method: Option<String>,
    pub monitoring_tubes: Vec<MonitoringTubePositions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwPositionsMeasuring {
    pub event_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_level_position: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_level_positioning_method: Option<String>,
    pub monitoring_tubes: Vec<MonitoringTubePositions>,
}

/// A vertical shift of the whole well, expressed as a new ground level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwShift {
    pub event_date: String,
    pub ground_level_position: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwMaintainer {
    pub event_date: String,
    pub maintenance_responsible_party: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwOwner {
    pub event_date: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwRemoval {
    pub event_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringTubeStatus {
    pub tube_number: Scalar,
    pub tube_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwTubeStatus {
    pub event_date: String,
    pub monitoring_tubes: Vec<MonitoringTubeStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwWellHeadProtector {
    pub event_date: String,
    pub well_head_protector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectrodeStatusChange {
    pub cable_number: Scalar,
    pub electrode_number: Scalar,
    pub electrode_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmwElectrodeStatus {
    pub event_date: String,
    pub electrodes: Vec<ElectrodeStatusChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lengthening_accepts_camel_case_input() {
        let doc: GmwLengthening = serde_json::from_value(json!({
            "eventDate": "2023-10-01",
            "monitoringTubes": [{
                "tubeNumber": 1,
                "tubeTopPosition": 10.5,
                "tubeTopPositioningMethod": "0tot2cmwaterpassing",
                "plainTubePartLength": 5.0,
            }],
        }))
        .unwrap();
        assert_eq!(doc.event_date, "2023-10-01");
        assert_eq!(doc.monitoring_tubes.len(), 1);
        assert!(doc.monitoring_tubes[0].variable_diameter.is_none());
    }

    #[test]
    fn lengthening_tube_length_may_be_absent() {
        let doc: GmwShortening = serde_json::from_value(json!({
            "eventDate": "2023-10-01",
            "monitoringTubes": [{
                "tubeNumber": 2,
                "tubeTopPosition": "3,25",
                "tubeTopPositioningMethod": "RTKGPS0tot4cm",
            }],
        }))
        .unwrap();
        let tube = &doc.monitoring_tubes[0];
        assert!(tube.plain_tube_part_length.is_none());
        assert_eq!(tube.tube_top_position.as_f64(), Some(3.25));
    }

    #[test]
    fn owner_change_round_trips() {
        let input = json!({"eventDate": "2023-10-01", "owner": "27376655"});
        let doc: GmwOwner = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }
}
