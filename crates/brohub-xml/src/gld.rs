//! Source-document bodies for the GLD family. The addition document carries
//! an O&M observation with a WaterML measurement time series.

use brohub_core::payloads::gld::{GldAddition, GldClosure, GldStartRegistration};
use brohub_core::payloads::TimeValuePair;
use brohub_core::AppError;

use crate::writer::{DocWriter, IdGen};

pub(crate) fn start_registration(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GldStartRegistration,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GLD_StartRegistration", &[("gml:id", id.as_str())])?;
    doc.opt_leaf(
        "objectIdAccountableParty",
        data.object_id_accountable_party.as_deref(),
    )?;
    for net in data.groundwater_monitoring_nets.iter().flatten() {
        doc.open("groundwaterMonitoringNet")?;
        let net_id = ids.labeled("net");
        doc.open_with("gldcom:GroundwaterMonitoringNet", &[("gml:id", net_id.as_str())])?;
        doc.leaf("gldcom:broId", net)?;
        doc.close("gldcom:GroundwaterMonitoringNet")?;
        doc.close("groundwaterMonitoringNet")?;
    }
    doc.open("monitoringPoint")?;
    let tube_id = ids.labeled("tube");
    doc.open_with(
        "gldcom:GroundwaterMonitoringTube",
        &[("gml:id", tube_id.as_str())],
    )?;
    doc.leaf("gldcom:broId", &data.gmw_bro_id)?;
    doc.leaf("gldcom:tubeNumber", &data.tube_number.render())?;
    doc.close("gldcom:GroundwaterMonitoringTube")?;
    doc.close("monitoringPoint")?;
    doc.close("GLD_StartRegistration")
}

fn write_time_value_pair(doc: &mut DocWriter, pair: &TimeValuePair) -> Result<(), AppError> {
    doc.open("wml2:point")?;
    doc.open("wml2:MeasurementTVP")?;
    doc.leaf("wml2:time", &pair.time)?;
    doc.leaf_with("wml2:value", &[("uom", "m")], &pair.value.render())?;
    doc.open("wml2:metadata")?;
    doc.open("wml2:TVPMeasurementMetadata")?;
    doc.open("wml2:qualifier")?;
    doc.open("swe:Category")?;
    doc.leaf("swe:value", &pair.status_quality_control)?;
    doc.close("swe:Category")?;
    doc.close("wml2:qualifier")?;
    doc.opt_leaf("wml2:censoredReason", pair.censor_reason.as_deref())?;
    if let Some(limit) = &pair.censoring_limitvalue {
        doc.leaf_with("wml2:censoringLimitvalue", &[("uom", "m")], &limit.render())?;
    }
    doc.close("wml2:TVPMeasurementMetadata")?;
    doc.close("wml2:metadata")?;
    doc.close("wml2:MeasurementTVP")?;
    doc.close("wml2:point")
}

pub(crate) fn addition(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GldAddition,
) -> Result<(), AppError> {
    // normalize() ran at construction; the ids are always present here.
    let fallback = ids.document_id();
    let observation_id = data.observation_id.as_deref().unwrap_or(&fallback);
    let process_id = data.observation_process_id.as_deref().unwrap_or(&fallback);
    let timeseries_id = data
        .measurement_timeseries_id
        .as_deref()
        .unwrap_or(&fallback);

    doc.open("GLD_Addition")?;
    doc.open("observation")?;
    doc.open_with("om:OM_Observation", &[("gml:id", observation_id)])?;

    doc.open("om:metadata")?;
    doc.open("gldcom:ObservationMetadata")?;
    doc.leaf_with(
        "gldcom:observationType",
        &[("codeSpace", "urn:bro:gld:ObservationType")],
        &data.observation_type,
    )?;
    doc.opt_leaf_with(
        "gldcom:status",
        &[("codeSpace", "urn:bro:gld:StatusCode")],
        data.validation_status.as_deref(),
    )?;
    doc.open("gldcom:investigator")?;
    doc.leaf("brocom:chamberOfCommerceNumber", &data.investigator_kvk)?;
    doc.close("gldcom:investigator")?;
    doc.close("gldcom:ObservationMetadata")?;
    doc.close("om:metadata")?;

    doc.open("om:phenomenonTime")?;
    let period_id = ids.labeled("timeperiod");
    doc.open_with("gml:TimePeriod", &[("gml:id", period_id.as_str())])?;
    doc.leaf("gml:beginPosition", &data.begin_position)?;
    doc.leaf("gml:endPosition", &data.end_position)?;
    doc.close("gml:TimePeriod")?;
    doc.close("om:phenomenonTime")?;

    doc.open("om:resultTime")?;
    let instant_id = ids.labeled("timeinstant");
    doc.open_with("gml:TimeInstant", &[("gml:id", instant_id.as_str())])?;
    doc.leaf(
        "gml:timePosition",
        data.result_time.as_deref().unwrap_or(&data.end_position),
    )?;
    doc.close("gml:TimeInstant")?;
    doc.close("om:resultTime")?;

    doc.open("om:procedure")?;
    doc.open_with("gldcom:ObservationProcess", &[("gml:id", process_id)])?;
    doc.leaf_with(
        "gldcom:processReference",
        &[("codeSpace", "urn:bro:gld:ProcessReference")],
        &data.process_reference,
    )?;
    doc.leaf_with(
        "gldcom:measurementInstrumentType",
        &[("codeSpace", "urn:bro:gld:MeasurementInstrumentType")],
        &data.measurement_instrument_type,
    )?;
    doc.opt_leaf_with(
        "gldcom:airPressureCompensationType",
        &[("codeSpace", "urn:bro:gld:AirPressureCompensationType")],
        data.air_pressure_compensation_type.as_deref(),
    )?;
    doc.leaf_with(
        "gldcom:evaluationProcedure",
        &[("codeSpace", "urn:bro:gld:EvaluationProcedure")],
        &data.evaluation_procedure,
    )?;
    doc.close("gldcom:ObservationProcess")?;
    doc.close("om:procedure")?;

    doc.open("om:result")?;
    doc.open_with("wml2:MeasurementTimeseries", &[("gml:id", timeseries_id)])?;
    for pair in &data.time_value_pairs {
        write_time_value_pair(doc, pair)?;
    }
    doc.close("wml2:MeasurementTimeseries")?;
    doc.close("om:result")?;

    doc.close("om:OM_Observation")?;
    doc.close("observation")?;
    doc.close("GLD_Addition")
}

pub(crate) fn closure(doc: &mut DocWriter, _data: &GldClosure) -> Result<(), AppError> {
    doc.empty("GLD_Closure")
}
