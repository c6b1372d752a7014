//! Source-document body for a groundwater analysis report.

use brohub_core::payloads::gar::Gar;
use brohub_core::payloads::{Analysis, AnalysisProcess, FieldResearch, LaboratoryAnalysis};
use brohub_core::AppError;

use crate::writer::{DocWriter, IdGen};

fn write_field_research(
    doc: &mut DocWriter,
    research: &FieldResearch,
) -> Result<(), AppError> {
    doc.open("fieldResearch")?;
    doc.leaf("garcom:samplingDateTime", &research.sampling_date_time)?;
    doc.open("garcom:samplingOperator")?;
    doc.leaf("brocom:chamberOfCommerceNumber", &research.sampling_operator)?;
    doc.close("garcom:samplingOperator")?;
    doc.opt_leaf_with(
        "garcom:samplingStandard",
        &[("codeSpace", "urn:bro:gar:SamplingStandard")],
        research.sampling_standard.as_deref(),
    )?;
    doc.open("garcom:samplingDevice")?;
    doc.leaf_with(
        "garcom:pumpType",
        &[("codeSpace", "urn:bro:gar:PumpType")],
        &research.pump_type,
    )?;
    doc.close("garcom:samplingDevice")?;

    doc.open("garcom:fieldObservation")?;
    doc.opt_leaf_with(
        "garcom:primaryColour",
        &[("codeSpace", "urn:bro:gar:Colour")],
        research.primary_colour.as_deref(),
    )?;
    doc.opt_leaf_with(
        "garcom:secondaryColour",
        &[("codeSpace", "urn:bro:gar:Colour")],
        research.secondary_colour.as_deref(),
    )?;
    doc.opt_leaf_with(
        "garcom:colourStrength",
        &[("codeSpace", "urn:bro:gar:ColourStrength")],
        research.colour_strength.as_deref(),
    )?;
    doc.leaf("garcom:abnormalityInCooling", &research.abnormality_in_cooling)?;
    doc.leaf("garcom:abnormalityInDevice", &research.abnormality_in_device)?;
    doc.leaf("garcom:pollutedByEngine", &research.polluted_by_engine)?;
    doc.leaf("garcom:filterAerated", &research.filter_aerated)?;
    doc.leaf(
        "garcom:groundWaterLevelDroppedTooMuch",
        &research.ground_water_level_dropped_too_much,
    )?;
    doc.leaf("garcom:abnormalFilter", &research.abnormal_filter)?;
    doc.leaf("garcom:sampleAerated", &research.sample_aerated)?;
    doc.leaf("garcom:hoseReused", &research.hose_reused)?;
    doc.leaf(
        "garcom:temperatureDifficultToMeasure",
        &research.temperature_difficult_to_measure,
    )?;
    doc.close("garcom:fieldObservation")?;

    for measurement in research.field_measurements.iter().flatten() {
        doc.open("garcom:fieldMeasurement")?;
        doc.leaf("garcom:parameter", &measurement.parameter.render())?;
        doc.leaf_with(
            "garcom:fieldMeasurementValue",
            &[("uom", measurement.unit.as_str())],
            &measurement.field_measurement_value.render(),
        )?;
        doc.leaf_with(
            "garcom:qualityControlStatus",
            &[("codeSpace", "urn:bro:gar:QualityControlStatus")],
            &measurement.quality_control_status,
        )?;
        doc.close("garcom:fieldMeasurement")?;
    }
    doc.close("fieldResearch")
}

fn write_analysis(doc: &mut DocWriter, analysis: &Analysis) -> Result<(), AppError> {
    doc.open("garcom:analysis")?;
    doc.leaf("garcom:parameter", &analysis.parameter.render())?;
    doc.leaf_with(
        "garcom:analysisMeasurementValue",
        &[("uom", analysis.unit.as_str())],
        &analysis.analysis_measurement_value.render(),
    )?;
    doc.opt_leaf("garcom:limitSymbol", analysis.limit_symbol.as_deref())?;
    if let Some(limit) = &analysis.reporting_limit {
        doc.leaf_with(
            "garcom:reportingLimit",
            &[("uom", analysis.unit.as_str())],
            &limit.render(),
        )?;
    }
    doc.leaf_with(
        "garcom:qualityControlStatus",
        &[("codeSpace", "urn:bro:gar:QualityControlStatus")],
        &analysis.quality_control_status,
    )?;
    doc.close("garcom:analysis")
}

fn write_analysis_process(doc: &mut DocWriter, process: &AnalysisProcess) -> Result<(), AppError> {
    doc.open("garcom:analysisProcess")?;
    doc.date_block("garcom:analysisDate", &process.date)?;
    doc.leaf_with(
        "garcom:analyticalTechnique",
        &[("codeSpace", "urn:bro:gar:AnalyticalTechnique")],
        &process.analytical_technique,
    )?;
    doc.leaf_with(
        "garcom:valuationMethod",
        &[("codeSpace", "urn:bro:gar:ValuationMethod")],
        &process.valuation_method,
    )?;
    for analysis in &process.analyses {
        write_analysis(doc, analysis)?;
    }
    doc.close("garcom:analysisProcess")
}

fn write_laboratory_analysis(
    doc: &mut DocWriter,
    lab: &LaboratoryAnalysis,
) -> Result<(), AppError> {
    doc.open("laboratoryAnalysis")?;
    if let Some(kvk) = &lab.responsible_laboratory_kvk {
        doc.open("garcom:responsibleLaboratory")?;
        doc.leaf("brocom:chamberOfCommerceNumber", kvk)?;
        doc.close("garcom:responsibleLaboratory")?;
    }
    for process in &lab.analysis_processes {
        write_analysis_process(doc, process)?;
    }
    doc.close("laboratoryAnalysis")
}

pub(crate) fn report(doc: &mut DocWriter, ids: &mut IdGen, data: &Gar) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GAR", &[("gml:id", id.as_str())])?;
    doc.leaf("objectIdAccountableParty", &data.object_id_accountable_party)?;
    doc.leaf_with(
        "qualityControlMethod",
        &[("codeSpace", "urn:bro:gar:QualityControlMethod")],
        &data.quality_control_method,
    )?;
    for net in data.groundwater_monitoring_nets.iter().flatten() {
        doc.open("groundwaterMonitoringNet")?;
        let net_id = ids.labeled("net");
        doc.open_with("garcom:GroundwaterMonitoringNet", &[("gml:id", net_id.as_str())])?;
        doc.leaf("garcom:broId", net)?;
        doc.close("garcom:GroundwaterMonitoringNet")?;
        doc.close("groundwaterMonitoringNet")?;
    }
    doc.open("monitoringPoint")?;
    let tube_id = ids.labeled("tube");
    doc.open_with(
        "garcom:GroundwaterMonitoringTube",
        &[("gml:id", tube_id.as_str())],
    )?;
    doc.leaf("garcom:broId", &data.gmw_bro_id)?;
    doc.leaf("garcom:tubeNumber", &data.tube_number.render())?;
    doc.close("garcom:GroundwaterMonitoringTube")?;
    doc.close("monitoringPoint")?;
    write_field_research(doc, &data.field_research)?;
    for lab in data.laboratory_analyses.iter().flatten() {
        write_laboratory_analysis(doc, lab)?;
    }
    doc.close("GAR")
}
