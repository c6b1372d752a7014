//! Source-document bodies for the GMW family: the construction document and
//! the event documents that amend a registered well.

use brohub_core::payloads::gmw::{
    GmwConstruction, GmwElectrodeStatus, GmwGroundLevel, GmwGroundLevelMeasuring, GmwInsertion,
    GmwLengthening, GmwMaintainer, GmwOwner, GmwPositions, GmwPositionsMeasuring, GmwRemoval,
    GmwShift, GmwShortening, GmwTubeStatus, GmwWellHeadProtector, MonitoringTubeLengthening,
    MonitoringTubePositions,
};
use brohub_core::payloads::{GeoOhmCable, MonitoringTube, Scalar};
use brohub_core::AppError;

use crate::namespaces::gmw_codespace;
use crate::writer::{DocWriter, IdGen};

const RD_CRS: &str = "urn:ogc:def:crs:EPSG::28992";

fn coded(name: &str) -> [(&'static str, &'static str); 1] {
    // Falls back to an empty codeSpace only for names missing from the
    // table, which would be a programming error caught by tests.
    [("codeSpace", gmw_codespace(name).unwrap_or_default())]
}

fn coded_leaf(doc: &mut DocWriter, name: &str, value: &str) -> Result<(), AppError> {
    match gmw_codespace(name) {
        Some(urn) => doc.leaf_with(name, &[("codeSpace", urn)], value),
        None => doc.leaf(name, value),
    }
}

fn uom_leaf(doc: &mut DocWriter, name: &str, value: &Scalar, unit: &str) -> Result<(), AppError> {
    doc.leaf_with(name, &[("uom", unit)], &value.render())
}

fn write_geo_ohm_cable(doc: &mut DocWriter, cable: &GeoOhmCable) -> Result<(), AppError> {
    doc.open("geoOhmCable")?;
    doc.leaf("cableNumber", &cable.cable_number.render())?;
    for electrode in &cable.electrodes {
        doc.open("electrode")?;
        doc.leaf_with(
            "gmwcom:electrodePackingMaterial",
            &coded("electrodePackingMaterial"),
            &electrode.electrode_packing_material,
        )?;
        doc.leaf_with(
            "gmwcom:electrodeStatus",
            &coded("electrodeStatus"),
            &electrode.electrode_status,
        )?;
        doc.leaf_with(
            "gmwcom:electrodePosition",
            &[("uom", "m")],
            &electrode.electrode_position.render(),
        )?;
        doc.leaf("gmwcom:electrodeNumber", &electrode.electrode_number.render())?;
        doc.close("electrode")?;
    }
    doc.close("geoOhmCable")
}

fn write_monitoring_tube(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    tube: &MonitoringTube,
) -> Result<(), AppError> {
    doc.open("monitoringTube")?;
    let tube_id = ids.labeled("tube");
    doc.open_with("MonitoringTube", &[("gml:id", tube_id.as_str())])?;
    doc.leaf("tubeNumber", &tube.tube_number.render())?;
    coded_leaf(doc, "tubeType", &tube.tube_type)?;
    doc.leaf("artesianWellCapPresent", &tube.artesian_well_cap_present)?;
    doc.leaf("sedimentSumpPresent", &tube.sediment_sump_present)?;
    doc.leaf("numberOfGeoOhmCables", &tube.number_of_geo_ohm_cables.render())?;
    uom_leaf(doc, "tubeTopDiameter", &tube.tube_top_diameter, "mm")?;
    doc.leaf("variableDiameter", &tube.variable_diameter.render())?;
    coded_leaf(doc, "tubeStatus", &tube.tube_status)?;
    uom_leaf(doc, "tubeTopPosition", &tube.tube_top_position, "m")?;
    coded_leaf(doc, "tubeTopPositioningMethod", &tube.tube_top_positioning_method)?;
    doc.open("materialUsed")?;
    doc.leaf_with(
        "gmwcom:tubePackingMaterial",
        &coded("tubePackingMaterial"),
        &tube.tube_packing_material,
    )?;
    doc.leaf_with(
        "gmwcom:tubeMaterial",
        &coded("tubeMaterial"),
        &tube.tube_material,
    )?;
    doc.leaf_with("gmwcom:glue", &coded("glue"), &tube.glue)?;
    doc.close("materialUsed")?;
    doc.open("screen")?;
    doc.leaf_with("screenLength", &[("uom", "m")], &tube.screen_length.render())?;
    coded_leaf(doc, "sockMaterial", &tube.sock_material)?;
    doc.close("screen")?;
    doc.open("plainTubePart")?;
    doc.leaf_with(
        "gmwcom:plainTubePartLength",
        &[("uom", "m")],
        &tube.plain_tube_part_length.render(),
    )?;
    doc.close("plainTubePart")?;
    doc.open("sedimentSump")?;
    doc.leaf_with(
        "gmwcom:sedimentSumpLength",
        &[("uom", "m")],
        &tube.sediment_sump_length.render(),
    )?;
    doc.close("sedimentSump")?;
    for cable in tube.geoohmcables.iter().flatten() {
        write_geo_ohm_cable(doc, cable)?;
    }
    doc.close("MonitoringTube")?;
    doc.close("monitoringTube")
}

pub(crate) fn construction(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwConstruction,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMW_Construction", &[("gml:id", id.as_str())])?;
    doc.leaf("objectIdAccountableParty", &data.object_id_accountable_party)?;
    coded_leaf(doc, "deliveryContext", &data.delivery_context)?;
    coded_leaf(doc, "constructionStandard", &data.construction_standard)?;
    coded_leaf(doc, "initialFunction", &data.initial_function)?;
    doc.leaf("numberOfMonitoringTubes", &data.number_of_monitoring_tubes.render())?;
    doc.leaf("groundLevelStable", &data.ground_level_stable)?;
    doc.leaf("owner", &data.owner)?;
    doc.opt_leaf(
        "maintenanceResponsibleParty",
        data.maintenance_responsible_party.as_deref(),
    )?;
    coded_leaf(doc, "wellHeadProtector", &data.well_head_protector)?;
    doc.date_block("wellConstructionDate", &data.well_construction_date)?;

    doc.open("deliveredLocation")?;
    let location_id = ids.labeled("location");
    doc.open_with(
        "gmwcom:location",
        &[("gml:id", location_id.as_str()), ("srsName", RD_CRS)],
    )?;
    doc.leaf("gml:pos", &data.delivered_location)?;
    doc.close("gmwcom:location")?;
    doc.leaf_with(
        "gmwcom:horizontalPositioningMethod",
        &coded("horizontalPositioningMethod"),
        &data.horizontal_positioning_method,
    )?;
    doc.close("deliveredLocation")?;

    doc.open("deliveredVerticalPosition")?;
    doc.leaf_with(
        "gmwcom:localVerticalReferencePoint",
        &coded("localVerticalReferencePoint"),
        &data.local_vertical_reference_point,
    )?;
    doc.leaf_with("gmwcom:offset", &[("uom", "m")], &data.offset.render())?;
    doc.leaf_with(
        "gmwcom:verticalDatum",
        &coded("verticalDatum"),
        &data.vertical_datum,
    )?;
    doc.leaf_with(
        "gmwcom:groundLevelPosition",
        &[("uom", "m")],
        &data.ground_level_position.render(),
    )?;
    doc.leaf_with(
        "gmwcom:groundLevelPositioningMethod",
        &coded("groundLevelPositioningMethod"),
        &data.ground_level_positioning_method,
    )?;
    doc.close("deliveredVerticalPosition")?;

    for tube in &data.monitoring_tubes {
        write_monitoring_tube(doc, ids, tube)?;
    }
    doc.close("GMW_Construction")
}

fn write_lengthening_tube(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    tube: &MonitoringTubeLengthening,
) -> Result<(), AppError> {
    doc.open("monitoringTube")?;
    let tube_id = ids.labeled("tube");
    doc.open_with("MonitoringTube", &[("gml:id", tube_id.as_str())])?;
    doc.leaf("tubeNumber", &tube.tube_number.render())?;
    if let Some(diameter) = &tube.variable_diameter {
        doc.leaf("variableDiameter", &diameter.render())?;
    }
    uom_leaf(doc, "tubeTopPosition", &tube.tube_top_position, "m")?;
    coded_leaf(doc, "tubeTopPositioningMethod", &tube.tube_top_positioning_method)?;
    if tube.tube_material.is_some() || tube.glue.is_some() {
        doc.open("materialUsed")?;
        if let Some(material) = &tube.tube_material {
            doc.leaf_with("gmwcom:tubeMaterial", &coded("tubeMaterial"), material)?;
        }
        if let Some(glue) = &tube.glue {
            doc.leaf_with("gmwcom:glue", &coded("glue"), glue)?;
        }
        doc.close("materialUsed")?;
    }
    if let Some(length) = &tube.plain_tube_part_length {
        doc.open("plainTubePart")?;
        doc.leaf_with("gmwcom:plainTubePartLength", &[("uom", "m")], &length.render())?;
        doc.close("plainTubePart")?;
    }
    doc.close("MonitoringTube")?;
    doc.close("monitoringTube")
}

fn event_document(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    element: &str,
    event_date: &str,
    body: impl FnOnce(&mut DocWriter, &mut IdGen) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with(element, &[("gml:id", id.as_str())])?;
    doc.date_block("eventDate", event_date)?;
    body(doc, ids)?;
    doc.close(element)
}

pub(crate) fn lengthening(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwLengthening,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Lengthening", &data.event_date, |doc, ids| {
        if let Some(protector) = &data.well_head_protector {
            doc.leaf_with("wellHeadProtector", &coded("wellHeadProtector"), protector)?;
        }
        for tube in &data.monitoring_tubes {
            write_lengthening_tube(doc, ids, tube)?;
        }
        Ok(())
    })
}

pub(crate) fn shortening(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwShortening,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Shortening", &data.event_date, |doc, ids| {
        if let Some(protector) = &data.well_head_protector {
            doc.leaf_with("wellHeadProtector", &coded("wellHeadProtector"), protector)?;
        }
        for tube in &data.monitoring_tubes {
            write_lengthening_tube(doc, ids, tube)?;
        }
        Ok(())
    })
}

pub(crate) fn ground_level(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwGroundLevel,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_GroundLevel", &data.event_date, |doc, _| {
        doc.leaf_with(
            "gmwcom:groundLevelPosition",
            &[("uom", "m")],
            &data.ground_level_position.render(),
        )?;
        doc.leaf_with(
            "gmwcom:groundLevelPositioningMethod",
            &coded("groundLevelPositioningMethod"),
            &data.ground_level_positioning_method,
        )
    })
}

pub(crate) fn ground_level_measuring(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwGroundLevelMeasuring,
) -> Result<(), AppError> {
    event_document(
        doc,
        ids,
        "GMW_GroundLevelMeasuring",
        &data.event_date,
        |doc, _| {
            doc.leaf_with(
                "gmwcom:groundLevelPosition",
                &[("uom", "m")],
                &data.ground_level_position.render(),
            )?;
            doc.leaf_with(
                "gmwcom:groundLevelPositioningMethod",
                &coded("groundLevelPositioningMethod"),
                &data.ground_level_positioning_method,
            )
        },
    )
}

pub(crate) fn insertion(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwInsertion,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Insertion", &data.event_date, |doc, _| {
        doc.leaf("tubeNumber", &data.tube_number.render())?;
        uom_leaf(doc, "tubeTopPosition", &data.tube_top_position, "m")?;
        coded_leaf(doc, "tubeTopPositioningMethod", &data.tube_top_positioning_method)?;
        uom_leaf(doc, "insertedPartLength", &data.inserted_part_length, "m")?;
        uom_leaf(doc, "insertedPartDiameter", &data.inserted_part_diameter, "mm")?;
        doc.leaf("insertedPartMaterial", &data.inserted_part_material)
    })
}

fn write_positions_body(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    ground_level_position: Option<&Scalar>,
    ground_level_positioning_method: Option<&str>,
    tubes: &[MonitoringTubePositions],
) -> Result<(), AppError> {
    if let Some(position) = ground_level_position {
        doc.leaf_with(
            "gmwcom:groundLevelPosition",
            &[("uom", "m")],
            &position.render(),
        )?;
    }
    if let Some(method) = ground_level_positioning_method {
        doc.leaf_with(
            "gmwcom:groundLevelPositioningMethod",
            &coded("groundLevelPositioningMethod"),
            method,
        )?;
    }
    for tube in tubes {
        doc.open("monitoringTube")?;
        let tube_id = ids.labeled("tube");
        doc.open_with("MonitoringTube", &[("gml:id", tube_id.as_str())])?;
        doc.leaf("tubeNumber", &tube.tube_number.render())?;
        uom_leaf(doc, "tubeTopPosition", &tube.tube_top_position, "m")?;
        coded_leaf(doc, "tubeTopPositioningMethod", &tube.tube_top_positioning_method)?;
        doc.close("MonitoringTube")?;
        doc.close("monitoringTube")?;
    }
    Ok(())
}

pub(crate) fn positions(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwPositions,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Positions", &data.event_date, |doc, ids| {
        write_positions_body(
            doc,
            ids,
            data.ground_level_position.as_ref(),
            data.ground_level_positioning_method.as_deref(),
            &data.monitoring_tubes,
        )
    })
}

pub(crate) fn positions_measuring(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwPositionsMeasuring,
) -> Result<(), AppError> {
    event_document(
        doc,
        ids,
        "GMW_PositionsMeasuring",
        &data.event_date,
        |doc, ids| {
            write_positions_body(
                doc,
                ids,
                data.ground_level_position.as_ref(),
                data.ground_level_positioning_method.as_deref(),
                &data.monitoring_tubes,
            )
        },
    )
}

pub(crate) fn shift(doc: &mut DocWriter, ids: &mut IdGen, data: &GmwShift) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Shift", &data.event_date, |doc, _| {
        doc.leaf_with(
            "gmwcom:groundLevelPosition",
            &[("uom", "m")],
            &data.ground_level_position.render(),
        )
    })
}

pub(crate) fn maintainer(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwMaintainer,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Maintainer", &data.event_date, |doc, _| {
        doc.leaf(
            "maintenanceResponsibleParty",
            &data.maintenance_responsible_party,
        )
    })
}

pub(crate) fn owner(doc: &mut DocWriter, ids: &mut IdGen, data: &GmwOwner) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_Owner", &data.event_date, |doc, _| {
        doc.leaf("owner", &data.owner)
    })
}

pub(crate) fn removal(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwRemoval,
) -> Result<(), AppError> {
    let id = ids.document_id();
    doc.open_with("GMW_Removal", &[("gml:id", id.as_str())])?;
    doc.date_block("wellRemovalDate", &data.event_date)?;
    doc.close("GMW_Removal")
}

pub(crate) fn tube_status(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwTubeStatus,
) -> Result<(), AppError> {
    event_document(doc, ids, "GMW_TubeStatus", &data.event_date, |doc, ids| {
        for tube in &data.monitoring_tubes {
            doc.open("monitoringTube")?;
            let tube_id = ids.labeled("tube");
            doc.open_with("MonitoringTube", &[("gml:id", tube_id.as_str())])?;
            doc.leaf("tubeNumber", &tube.tube_number.render())?;
            coded_leaf(doc, "tubeStatus", &tube.tube_status)?;
            doc.close("MonitoringTube")?;
            doc.close("monitoringTube")?;
        }
        Ok(())
    })
}

pub(crate) fn well_head_protector(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwWellHeadProtector,
) -> Result<(), AppError> {
    event_document(
        doc,
        ids,
        "GMW_WellHeadProtector",
        &data.event_date,
        |doc, _| doc.leaf_with("wellHeadProtector", &coded("wellHeadProtector"), &data.well_head_protector),
    )
}

pub(crate) fn electrode_status(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    data: &GmwElectrodeStatus,
) -> Result<(), AppError> {
    event_document(
        doc,
        ids,
        "GMW_ElectrodeStatus",
        &data.event_date,
        |doc, _| {
            for electrode in &data.electrodes {
                doc.open("electrode")?;
                doc.leaf("gmwcom:cableNumber", &electrode.cable_number.render())?;
                doc.leaf("gmwcom:electrodeNumber", &electrode.electrode_number.render())?;
                doc.leaf_with(
                    "gmwcom:electrodeStatus",
                    &coded("electrodeStatus"),
                    &electrode.electrode_status,
                )?;
                doc.close("electrode")?;
            }
            Ok(())
        },
    )
}
