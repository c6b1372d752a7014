//! Source-document bodies for the GMN family.

use brohub_core::payloads::gmn::{
    GmnClosure, GmnMeasuringPoint, GmnMeasuringPointEndDate, GmnStartRegistration,
    GmnTubeReference,
};
use brohub_core::payloads::MeasuringPoint;
use brohub_core::AppError;

use crate::namespaces::gmn_codespace;
use crate::writer::{DocWriter, IdGen};

fn write_measuring_point(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    code: &str,
    bro_id: &str,
    tube_number: &str,
) -> Result<(), AppError> {
    doc.open("measuringPoint")?;
    let point_id = ids.labeled("measuringpoint");
    doc.open_with("MeasuringPoint", &[("gml:id", point_id.as_str())])?;
    doc.leaf("measuringPointCode", code)?;
    doc.open("monitoringTube")?;
    let tube_id = ids.labeled("tube");
    doc.open_with("GroundwaterMonitoringTube", &[("gml:id", tube_id.as_str())])?;
    doc.leaf("broId", bro_id)?;
    doc.leaf("tubeNumber", tube_number)?;
    doc.close("GroundwaterMonitoringTube")?;
    doc.close("monitoringTube")?;
    doc.close("MeasuringPoint")?;
    doc.close("measuringPoint")
}

fn coded_leaf(doc: &mut DocWriter, name: &str, value: &str) -> Result<(), AppError> {
    match gmn_codespace(name) {
        Some(urn) => doc.leaf_with(name, &[("codeSpace", urn)], value),
        None => doc.leaf(name, value),
    }
}

pub(crate) fn start_registration(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmnStartRegistration,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMN_StartRegistration", &[("gml:id", id.as_str())])?;
    doc.leaf("objectIdAccountableParty", &data.object_id_accountable_party)?;
    doc.leaf("name", &data.name)?;
    coded_leaf(doc, "deliveryContext", &data.delivery_context)?;
    coded_leaf(doc, "monitoringPurpose", &data.monitoring_purpose)?;
    coded_leaf(doc, "groundwaterAspect", &data.groundwater_aspect)?;
    doc.date_block("startDateMonitoring", &data.start_date_monitoring)?;
    for MeasuringPoint {
        measuring_point_code,
        bro_id,
        tube_number,
    } in &data.measuring_points
    {
        write_measuring_point(doc, ids, measuring_point_code, bro_id, &tube_number.render())?;
    }
    doc.close("GMN_StartRegistration")
}

pub(crate) fn measuring_point(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmnMeasuringPoint,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMN_MeasuringPoint", &[("gml:id", id.as_str())])?;
    doc.date_block("eventDate", &data.event_date)?;
    write_measuring_point(
        doc,
        ids,
        &data.measuring_point_code,
        &data.bro_id,
        &data.tube_number.render(),
    )?;
    doc.close("GMN_MeasuringPoint")
}

pub(crate) fn measuring_point_end_date(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmnMeasuringPointEndDate,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMN_MeasuringPointEndDate", &[("gml:id", id.as_str())])?;
    doc.date_block("eventDate", &data.event_date)?;
    doc.leaf("measuringPointCode", &data.measuring_point_code)?;
    doc.close("GMN_MeasuringPointEndDate")
}

pub(crate) fn tube_reference(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmnTubeReference,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMN_TubeReference", &[("gml:id", id.as_str())])?;
    doc.date_block("eventDate", &data.event_date)?;
    doc.leaf("measuringPointCode", &data.measuring_point_code)?;
    if let (Some(bro_id), Some(tube_number)) = (&data.bro_id, &data.tube_number) {
        doc.open("monitoringTube")?;
        let tube_id = ids.labeled("tube");
        doc.open_with("GroundwaterMonitoringTube", &[("gml:id", tube_id.as_str())])?;
        doc.leaf("broId", bro_id)?;
        doc.leaf("tubeNumber", &tube_number.render())?;
        doc.close("GroundwaterMonitoringTube")?;
        doc.close("monitoringTube")?;
    }
    doc.close("GMN_TubeReference")
}

pub(crate) fn closure(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmnClosure,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMN_Closure", &[("gml:id", id.as_str())])?;
    doc.date_block("endDateMonitoring", &data.end_date_monitoring)?;
    doc.close("GMN_Closure")
}
