//! Deterministic XML rendering for registry delivery requests.
//!
//! A request is `<{request_type}Request>` carrying the namespace map for the
//! document family, the common metadata block in fixed order, and one
//! `<sourceDocument>` with the variant body. Rendering is pure: the same
//! inputs always produce the same bytes, except for generated opaque ids
//! supplied by the payload itself.

mod frd;
mod gar;
mod gld;
mod gmn;
mod gmw;
pub mod namespaces;
mod writer;

use brohub_core::models::{RegistrationType, RequestType};
use brohub_core::payloads::{Metadata, SourceDocument};
use brohub_core::AppError;

use writer::{DocWriter, IdGen};

/// Insert and move requests reposition an event within a registered object's
/// history. The documents that create the object have no such position, so
/// those pairs are rejected before anything is written.
fn supports(request_type: RequestType, registration_type: RegistrationType) -> bool {
    use RegistrationType as R;
    use RequestType as T;
    if !matches!(request_type, T::Insert | T::Move) {
        return true;
    }
    !matches!(
        registration_type,
        R::GmnStartRegistration
            | R::GmwConstruction
            | R::Gar
            | R::GldStartRegistration
            | R::FrdStartRegistration
    )
}

/// Renders a complete delivery request document.
pub fn render_request(
    request_type: RequestType,
    registration_type: RegistrationType,
    metadata: &Metadata,
    document: &SourceDocument,
) -> Result<String, AppError> {
    if !supports(request_type, registration_type) {
        return Err(AppError::UnsupportedCombination {
            request_type: request_type.to_string(),
            registration_type: registration_type.to_string(),
        });
    }
    let mut doc = DocWriter::new();
    let mut ids = IdGen::new();
    doc.declaration()?;

    let root = format!("{request_type}Request");
    let map = namespaces::for_domain(registration_type.domain());

    let mut attrs: Vec<(String, &str)> = Vec::with_capacity(map.declarations.len() + 1);
    for (prefix, url) in map.declarations {
        let name = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        attrs.push((name, url));
    }
    attrs.push(("xsi:schemaLocation".to_string(), map.schema_location));
    let attr_refs: Vec<(&str, &str)> = attrs
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    doc.open_with(&root, &attr_refs)?;

    write_metadata(&mut doc, metadata)?;

    doc.open("sourceDocument")?;
    write_source_document(&mut doc, &mut ids, document)?;
    doc.close("sourceDocument")?;

    doc.close(&root)?;
    doc.into_string()
}

/// The common block between the root element and the source document.
/// Element order is mandated by the schema; absent and empty values are
/// omitted entirely.
fn write_metadata(doc: &mut DocWriter, metadata: &Metadata) -> Result<(), AppError> {
    doc.leaf("brocom:requestReference", &metadata.request_reference)?;
    doc.opt_leaf(
        "brocom:deliveryAccountableParty",
        metadata.delivery_accountable_party.as_deref(),
    )?;
    doc.opt_leaf("brocom:broId", metadata.bro_id.as_deref())?;
    doc.leaf("brocom:qualityRegime", &metadata.quality_regime)?;
    doc.opt_leaf(
        "brocom:correctionReason",
        metadata.correction_reason.as_deref(),
    )?;
    doc.opt_leaf("brocom:underPrivilege", metadata.under_privilege.as_deref())
}

fn write_source_document(
    doc: &mut DocWriter,
    ids: &mut IdGen,
    document: &SourceDocument,
) -> Result<(), AppError> {
    use SourceDocument as S;
    match document {
        S::GmnStartRegistration(data) => gmn::start_registration(doc, ids, data),
        S::GmnMeasuringPoint(data) => gmn::measuring_point(doc, ids, data),
        S::GmnMeasuringPointEndDate(data) => gmn::measuring_point_end_date(doc, ids, data),
        S::GmnTubeReference(data) => gmn::tube_reference(doc, ids, data),
        S::GmnClosure(data) => gmn::closure(doc, ids, data),
        S::GmwConstruction(data) => gmw::construction(doc, ids, data),
        S::GmwElectrodeStatus(data) => gmw::electrode_status(doc, ids, data),
        S::GmwGroundLevel(data) => gmw::ground_level(doc, ids, data),
        S::GmwGroundLevelMeasuring(data) => gmw::ground_level_measuring(doc, ids, data),
        S::GmwInsertion(data) => gmw::insertion(doc, ids, data),
        S::GmwLengthening(data) => gmw::lengthening(doc, ids, data),
        S::GmwShortening(data) => gmw::shortening(doc, ids, data),
        S::GmwPositions(data) => gmw::positions(doc, ids, data),
        S::GmwPositionsMeasuring(data) => gmw::positions_measuring(doc, ids, data),
        S::GmwShift(data) => gmw::shift(doc, ids, data),
        S::GmwMaintainer(data) => gmw::maintainer(doc, ids, data),
        S::GmwOwner(data) => gmw::owner(doc, ids, data),
        S::GmwRemoval(data) => gmw::removal(doc, ids, data),
        S::GmwTubeStatus(data) => gmw::tube_status(doc, ids, data),
        S::GmwWellHeadProtector(data) => gmw::well_head_protector(doc, ids, data),
        S::Gar(data) => gar::report(doc, ids, data),
        S::GldStartRegistration(data) => gld::start_registration(doc, ids, data),
        S::GldAddition(data) => gld::addition(doc, ids, data),
        S::GldClosure(data) => gld::closure(doc, data),
        S::FrdStartRegistration(data) => frd::start_registration(doc, ids, data),
        S::FrdGemMeasurementConfiguration(data) => {
            frd::gem_measurement_configuration(doc, ids, data)
        }
        S::FrdGemMeasurement(data) => frd::gem_measurement(doc, ids, data),
        S::FrdEmmInstrumentConfiguration(data) => {
            frd::emm_instrument_configuration(doc, ids, data)
        }
        S::FrdEmmMeasurement(data) => frd::emm_measurement(doc, ids, data),
        S::FrdClosure(data) => frd::closure(doc, data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(bro_id: Option<&str>) -> Metadata {
        Metadata {
            request_reference: "test".to_string(),
            delivery_accountable_party: Some("27376655".to_string()),
            quality_regime: "IMBRO/A".to_string(),
            bro_id: bro_id.map(str::to_string),
            under_privilege: None,
            correction_reason: None,
        }
    }

    fn render(
        request_type: RequestType,
        registration_type: RegistrationType,
        bro_id: Option<&str>,
        data: serde_json::Value,
    ) -> String {
        let document = SourceDocument::from_value(registration_type, &data).unwrap();
        render_request(request_type, registration_type, &metadata(bro_id), &document).unwrap()
    }

    /// Collapses indentation so documents compare on structure and content,
    /// not on pretty-printing.
    fn normalized(xml: &str) -> String {
        xml.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Whole-document comparison against the layout the portal accepts.
    #[test]
    fn gmn_start_registration_matches_portal_layout() {
        const EXPECTED: &str = r#"<registrationRequest xmlns="http://www.broservices.nl/xsd/isgmn/1.0"
    xmlns:brocom="http://www.broservices.nl/xsd/brocommon/3.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.broservices.nl/xsd/isgmn/1.0 https://schema.broservices.nl/xsd/isgmn/1.0/isgmn-messages.xsd">
    <brocom:requestReference>test</brocom:requestReference>
    <brocom:deliveryAccountableParty>27376655</brocom:deliveryAccountableParty>
    <brocom:qualityRegime>IMBRO/A</brocom:qualityRegime>
    <sourceDocument>
        <GMN_StartRegistration gml:id="id_0001">
            <objectIdAccountableParty>test</objectIdAccountableParty>
            <name>test</name>
            <deliveryContext codeSpace="urn:bro:gmn:DeliveryContext">kaderrichtlijnWater</deliveryContext>
            <monitoringPurpose codeSpace="urn:bro:gmn:MonitoringPurpose">strategischBeheerKwaliteitRegionaal</monitoringPurpose>
            <groundwaterAspect codeSpace="urn:bro:gmn:GroundwaterAspect">kwantiteit</groundwaterAspect>
            <startDateMonitoring>
                <brocom:date>2024-01-01</brocom:date>
            </startDateMonitoring>
            <measuringPoint>
                <MeasuringPoint gml:id="measuringpoint_1">
                    <measuringPointCode>GMW000000038946</measuringPointCode>
                    <monitoringTube>
                        <GroundwaterMonitoringTube gml:id="tube_1">
                            <broId>GMW000000038946</broId>
                            <tubeNumber>1</tubeNumber>
                        </GroundwaterMonitoringTube>
                    </monitoringTube>
                </MeasuringPoint>
            </measuringPoint>
            <measuringPoint>
                <MeasuringPoint gml:id="measuringpoint_2">
                    <measuringPointCode>GMW000000038946</measuringPointCode>
                    <monitoringTube>
                        <GroundwaterMonitoringTube gml:id="tube_2">
                            <broId>GMW000000038946</broId>
                            <tubeNumber>2</tubeNumber>
                        </GroundwaterMonitoringTube>
                    </monitoringTube>
                </MeasuringPoint>
            </measuringPoint>
        </GMN_StartRegistration>
    </sourceDocument>
</registrationRequest>"#;

        let xml = render(
            RequestType::Registration,
            RegistrationType::GmnStartRegistration,
            None,
            json!({
                "objectIdAccountableParty": "test",
                "name": "test",
                "deliveryContext": "kaderrichtlijnWater",
                "monitoringPurpose": "strategischBeheerKwaliteitRegionaal",
                "groundwaterAspect": "kwantiteit",
                "startDateMonitoring": "2024-01-01",
                "measuringPoints": [
                    {"measuringPointCode": "GMW000000038946", "broId": "GMW000000038946", "tubeNumber": 1},
                    {"measuringPointCode": "GMW000000038946", "broId": "GMW000000038946", "tubeNumber": 2},
                ],
            }),
        );

        let declaration = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
        let body = xml.strip_prefix(declaration).unwrap();
        assert_eq!(normalized(body), normalized(EXPECTED));
    }

    #[test]
    fn insert_of_a_start_registration_is_rejected() {
        let document = SourceDocument::from_value(
            RegistrationType::GmnStartRegistration,
            &json!({
                "objectIdAccountableParty": "test",
                "name": "test",
                "deliveryContext": "kaderrichtlijnWater",
                "monitoringPurpose": "strategischBeheerKwaliteitRegionaal",
                "groundwaterAspect": "kwantiteit",
                "startDateMonitoring": "2024-01-01",
                "measuringPoints": [],
            }),
        )
        .unwrap();
        let err = render_request(
            RequestType::Insert,
            RegistrationType::GmnStartRegistration,
            &metadata(None),
            &document,
        )
        .unwrap_err();
        match err {
            AppError::UnsupportedCombination {
                request_type,
                registration_type,
            } => {
                assert_eq!(request_type, "insert");
                assert_eq!(registration_type, "GMN_StartRegistration");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let data = json!({"eventDate": "2024-01-01", "owner": "27376655"});
        let first = render(
            RequestType::Replace,
            RegistrationType::GmwOwner,
            Some("GMW000000000001"),
            data.clone(),
        );
        let second = render(
            RequestType::Replace,
            RegistrationType::GmwOwner,
            Some("GMW000000000001"),
            data,
        );
        assert_eq!(first, second);
        assert!(first.contains("<replaceRequest"));
        assert!(first.contains("<brocom:broId>GMW000000000001</brocom:broId>"));
    }

    #[test]
    fn empty_optional_metadata_is_omitted() {
        let document = SourceDocument::from_value(
            RegistrationType::GmnClosure,
            &json!({"endDateMonitoring": "2024-06-01"}),
        )
        .unwrap();
        let metadata = Metadata {
            request_reference: "sluiting".to_string(),
            delivery_accountable_party: Some(String::new()),
            quality_regime: "IMBRO".to_string(),
            bro_id: Some("GMN000000000001".to_string()),
            under_privilege: None,
            correction_reason: None,
        };
        let xml = render_request(
            RequestType::Registration,
            RegistrationType::GmnClosure,
            &metadata,
            &document,
        )
        .unwrap();
        assert!(!xml.contains("deliveryAccountableParty"));
        assert!(!xml.contains("correctionReason"));
        assert!(xml.contains("<brocom:broId>GMN000000000001</brocom:broId>"));
    }

    #[test]
    fn gld_addition_renders_timeseries() {
        let xml = render(
            RequestType::Registration,
            RegistrationType::GldAddition,
            Some("GLD000000000001"),
            json!({
                "investigatorKvk": "12345678",
                "observationType": "reguliereMeting",
                "evaluationProcedure": "oordeelDeskundige",
                "measurementInstrumentType": "druksensor",
                "airPressureCompensationType": "monitoringsnetmeting",
                "processReference": "NEN5120v1991",
                "beginPosition": "2024-01-01T00:00:00",
                "endPosition": "2024-01-02T00:00:00",
                "timeValuePairs": [
                    {"time": "2024-01-01T12:00:00", "value": 1.22},
                ],
            }),
        );
        assert!(xml.contains(r#"xmlns:wml2="http://www.opengis.net/waterml/2.0""#));
        assert!(xml.contains("om:OM_Observation gml:id=\"_"));
        assert!(xml.contains("<gml:beginPosition>2024-01-01T00:00:00</gml:beginPosition>"));
        // resultTime falls back to the end position when not supplied.
        assert!(xml.contains("<gml:timePosition>2024-01-02T00:00:00</gml:timePosition>"));
        assert!(xml.contains(r#"<wml2:value uom="m">1.22</wml2:value>"#));
        assert!(xml.contains("<swe:value>onbekend</swe:value>"));
        assert!(xml.contains("airPressureCompensationType"));
    }

    #[test]
    fn every_variant_renders_for_minimal_valid_input() {
        // One representative per family that exercises each writer module.
        let cases: Vec<(RegistrationType, serde_json::Value)> = vec![
            (
                RegistrationType::GmnTubeReference,
                json!({"eventDate": "2024-01-01", "measuringPointCode": "MP1"}),
            ),
            (
                RegistrationType::GmwWellHeadProtector,
                json!({"eventDate": "2024-01-01", "wellHeadProtector": "potKoker"}),
            ),
            (
                RegistrationType::GmwShift,
                json!({"eventDate": "2024-01-01", "groundLevelPosition": 1.5}),
            ),
            (
                RegistrationType::FrdStartRegistration,
                json!({
                    "objectIdAccountableParty": "frd-1",
                    "gmwBroId": "GMW000000000001",
                    "tubeNumber": 1,
                }),
            ),
            (RegistrationType::FrdClosure, json!({})),
            (RegistrationType::GldClosure, json!({})),
        ];
        for (registration_type, data) in cases {
            let document = SourceDocument::from_value(registration_type, &data).unwrap();
            let xml = render_request(
                RequestType::Registration,
                registration_type,
                &metadata(Some("BRO0001")),
                &document,
            )
            .unwrap();
            assert!(
                xml.contains("<sourceDocument>"),
                "{registration_type} lacks a source document"
            );
        }
    }
}
