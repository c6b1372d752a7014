//! Groundwater analysis report (GAR) source document.

use serde::{Deserialize, Serialize};

use super::coerce::Scalar;
use super::common::{FieldResearch, LaboratoryAnalysis};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gar {
    pub object_id_accountable_party: String,
    pub quality_control_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundwater_monitoring_nets: Option<Vec<String>>,
    pub gmw_bro_id: String,
    pub tube_number: Scalar,
    pub field_research: FieldResearch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laboratory_analyses: Option<Vec<LaboratoryAnalysis>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lab_analyses_are_optional() {
        let doc: Gar = serde_json::from_value(json!({
            "objectIdAccountableParty": "GMW000000000001-001-2024",
            "qualityControlMethod": "handboekProvinciesRIVMv2017",
            "gmwBroId": "GMW000000000001",
            "tubeNumber": 1,
            "fieldResearch": {
                "samplingDateTime": "2024-05-13T12:00:00",
                "samplingOperator": "27376655",
                "pumpType": "onderwaterPomp",
            },
        }))
        .unwrap();
        assert!(doc.laboratory_analyses.is_none());

        let wire = serde_json::to_value(&doc).unwrap();
        assert!(wire.get("laboratoryAnalyses").is_none());
    }

    #[test]
    fn full_document_round_trips() {
        let input = json!({
            "objectIdAccountableParty": "GMW000000000001-002-2024",
            "qualityControlMethod": "handboekProvinciesRIVMv2017",
            "groundwaterMonitoringNets": ["GMN000000000001"],
            "gmwBroId": "GMW000000000001",
            "tubeNumber": 2,
            "fieldResearch": {
                "samplingDateTime": "2024-05-13T12:00:00",
                "samplingOperator": "27376655",
                "pumpType": "onderwaterPomp",
                "abnormalityInCooling": "nee",
                "abnormalityInDevice": "nee",
                "pollutedByEngine": "nee",
                "filterAerated": "nee",
                "groundWaterLevelDroppedTooMuch": "nee",
                "abnormalFilter": "nee",
                "sampleAerated": "nee",
                "hoseReused": "ja",
                "temperatureDifficultToMeasure": "nee",
                "fieldMeasurements": [{
                    "parameter": 1398,
                    "unit": "1",
                    "fieldMeasurementValue": 7.2,
                    "qualityControlStatus": "onbeslist",
                }],
            },
            "laboratoryAnalyses": [{
                "responsibleLaboratoryKvk": "24483298",
                "analysisProcesses": [{
                    "date": "2024-05-20",
                    "analyticalTechnique": "LC-MS-MS",
                    "valuationMethod": "I21675.19",
                    "analyses": [{
                        "parameter": 5741,
                        "unit": "ug/l",
                        "analysisMeasurementValue": 0.12,
                        "qualityControlStatus": "onbeslist",
                    }],
                }],
            }],
        });
        let doc: Gar = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }
}
