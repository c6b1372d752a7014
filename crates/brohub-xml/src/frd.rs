//! Source-document bodies for the FRD family.

use brohub_core::payloads::frd::{
    FrdClosure, FrdEmmInstrumentConfiguration, FrdEmmMeasurement, FrdGemMeasurement,
    FrdGemMeasurementConfiguration, FrdMeasurement, FrdStartRegistration,
};
use brohub_core::AppError;

use crate::writer::{DocWriter, IdGen};

pub(crate) fn start_registration(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &FrdStartRegistration,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("FRD_StartRegistration", &[("gml:id", id.as_str())])?;
    doc.leaf("objectIdAccountableParty", &data.object_id_accountable_party)?;
    for net in data.groundwater_monitoring_nets.iter().flatten() {
        doc.open("groundwaterMonitoringNet")?;
        let net_id = ids.labeled("net");
        doc.open_with("frdcom:GroundwaterMonitoringNet", &[("gml:id", net_id.as_str())])?;
        doc.leaf("frdcom:broId", net)?;
        doc.close("frdcom:GroundwaterMonitoringNet")?;
        doc.close("groundwaterMonitoringNet")?;
    }
    doc.open("groundwaterMonitoringTube")?;
    let tube_id = ids.labeled("tube");
    doc.open_with(
        "frdcom:MonitoringTube",
        &[("gml:id", tube_id.as_str())],
    )?;
    doc.leaf("frdcom:broId", &data.gmw_bro_id)?;
    doc.leaf("frdcom:tubeNumber", &data.tube_number.render())?;
    doc.close("frdcom:MonitoringTube")?;
    doc.close("groundwaterMonitoringTube")?;
    doc.close("FRD_StartRegistration")
}

pub(crate) fn gem_measurement_configuration(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &FrdGemMeasurementConfiguration,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("FRD_GEM_MeasurementConfiguration", &[("gml:id", id.as_str())])?;
    for configuration in &data.measurement_configurations {
        doc.open("measurementConfiguration")?;
        doc.open_with(
            "frdcom:MeasurementConfiguration",
            &[("gml:id", configuration.measurement_configuration_id.as_str())],
        )?;
        doc.leaf(
            "frdcom:measurementConfigurationID",
            &configuration.measurement_configuration_id,
        )?;
        doc.open("frdcom:measurementPair")?;
        doc.leaf("frdcom:firstCableNumber", &configuration.measurement_e1_cable_number.render())?;
        doc.leaf(
            "frdcom:firstElectrodeNumber",
            &configuration.measurement_e1_electrode_number.render(),
        )?;
        doc.leaf("frdcom:secondCableNumber", &configuration.measurement_e2_cable_number.render())?;
        doc.leaf(
            "frdcom:secondElectrodeNumber",
            &configuration.measurement_e2_electrode_number.render(),
        )?;
        doc.close("frdcom:measurementPair")?;
        doc.open("frdcom:flowCurrentPair")?;
        doc.leaf("frdcom:firstCableNumber", &configuration.current_e1_cable_number.render())?;
        doc.leaf(
            "frdcom:firstElectrodeNumber",
            &configuration.current_e1_electrode_number.render(),
        )?;
        doc.leaf("frdcom:secondCableNumber", &configuration.current_e2_cable_number.render())?;
        doc.leaf(
            "frdcom:secondElectrodeNumber",
            &configuration.current_e2_electrode_number.render(),
        )?;
        doc.close("frdcom:flowCurrentPair")?;
        doc.close("frdcom:MeasurementConfiguration")?;
        doc.close("measurementConfiguration")?;
    }
    doc.close("FRD_GEM_MeasurementConfiguration")
}

fn write_measurements(doc: &mut DocWriter, measurements: &[FrdMeasurement]) -> Result<(), AppError> {
    for measurement in measurements {
        doc.open("measure")?;
        doc.leaf_with(
            "frdcom:resistance",
            &[("uom", measurement.unit.as_str())],
            &measurement.value.render(),
        )?;
        doc.leaf(
            "frdcom:relatedMeasurementConfiguration",
            &measurement.configuration,
        )?;
        doc.close("measure")?;
    }
    Ok(())
}

fn measurement_header(
    doc: &mut DocWriter,
    date: &str,
    operator_kvk: &str,
    determination_procedure: &str,
    evaluation_procedure: &str,
) -> Result<(), AppError> {
    doc.date_block("measurementDate", date)?;
    doc.open("measurementOperator")?;
    doc.leaf("brocom:chamberOfCommerceNumber", operator_kvk)?;
    doc.close("measurementOperator")?;
    doc.leaf_with(
        "determinationProcedure",
        &[("codeSpace", "urn:bro:frd:DeterminationProcedure")],
        determination_procedure,
    )?;
    doc.leaf_with(
        "evaluationProcedure",
        &[("codeSpace", "urn:bro:frd:EvaluationProcedure")],
        evaluation_procedure,
    )
}

pub(crate) fn gem_measurement(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &FrdGemMeasurement,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("FRD_GEM_Measurement", &[("gml:id", id.as_str())])?;
    measurement_header(
        doc,
        &data.measurement_date,
        &data.measurement_operator_kvk,
        &data.determination_procedure,
        &data.evaluation_procedure,
    )?;
    write_measurements(doc, &data.measurements)?;
    doc.close("FRD_GEM_Measurement")
}

pub(crate) fn emm_instrument_configuration(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &FrdEmmInstrumentConfiguration,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("FRD_EMM_InstrumentConfiguration", &[("gml:id", id.as_str())])?;
    doc.open("instrumentConfiguration")?;
    doc.open_with(
        "frdcom:InstrumentConfiguration",
        &[("gml:id", data.instrument_configuration_id.as_str())],
    )?;
    doc.leaf(
        "frdcom:instrumentConfigurationID",
        &data.instrument_configuration_id,
    )?;
    doc.leaf_with(
        "frdcom:relativePositionTransmitterCoil",
        &[("uom", "cm")],
        &data.relative_position_transmitter_coil.render(),
    )?;
    doc.leaf_with(
        "frdcom:relativePositionPrimaryReceiverCoil",
        &[("uom", "cm")],
        &data.relative_position_primary_receiver_coil.render(),
    )?;
    doc.leaf(
        "frdcom:secondaryReceiverCoilAvailable",
        &data.secondary_receiver_coil_available,
    )?;
    if let Some(position) = &data.relative_position_secondary_receiver_coil {
        doc.leaf_with(
            "frdcom:relativePositionSecondaryReceiverCoil",
            &[("uom", "cm")],
            &position.render(),
        )?;
    }
    doc.leaf("frdcom:coilFrequencyKnown", &data.coil_frequency_known)?;
    if let Some(frequency) = &data.coil_frequency {
        doc.leaf_with("frdcom:coilFrequency", &[("uom", "kHz")], &frequency.render())?;
    }
    doc.leaf_with(
        "frdcom:instrumentLength",
        &[("uom", "cm")],
        &data.instrument_length.render(),
    )?;
    doc.close("frdcom:InstrumentConfiguration")?;
    doc.close("instrumentConfiguration")?;
    doc.close("FRD_EMM_InstrumentConfiguration")
}

pub(crate) fn emm_measurement(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &FrdEmmMeasurement,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("FRD_EMM_Measurement", &[("gml:id", id.as_str())])?;
    measurement_header(
        doc,
        &data.measurement_date,
        &data.measurement_operator_kvk,
        &data.determination_procedure,
        &data.evaluation_procedure,
    )?;
    write_measurements(doc, &data.measurements)?;
    doc.close("FRD_EMM_Measurement")
}

pub(crate) fn closure(doc: &mut DocWriter, _data: &FrdClosure) -> Result<(), AppError> {
    doc.empty("FRD_Closure")
}
