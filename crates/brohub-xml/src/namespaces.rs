//! Registry namespace maps and code spaces, keyed by domain.
//!
//! This table is a compatibility contract with the Bronhouderportaal schema
//! set: the URLs and codeSpace URNs are fixed and must not be derived.

use brohub_core::models::BroDomain;

pub const BROCOM: &str = "http://www.broservices.nl/xsd/brocommon/3.0";
pub const GML: &str = "http://www.opengis.net/gml/3.2";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const OM: &str = "http://www.opengis.net/om/2.0";
pub const SWE: &str = "http://www.opengis.net/swe/2.0";
pub const WATERML: &str = "http://www.opengis.net/waterml/2.0";

/// Namespace declarations and schemaLocation for one document family.
pub struct NamespaceMap {
    /// `(prefix, url)` pairs; an empty prefix is the default namespace.
    pub declarations: &'static [(&'static str, &'static str)],
    pub schema_location: &'static str,
}

static GMN: NamespaceMap = NamespaceMap {
    declarations: &[
        ("", "http://www.broservices.nl/xsd/isgmn/1.0"),
        ("brocom", BROCOM),
        ("gml", GML),
        ("xsi", XSI),
    ],
    schema_location: "http://www.broservices.nl/xsd/isgmn/1.0 https://schema.broservices.nl/xsd/isgmn/1.0/isgmn-messages.xsd",
};

static GMW: NamespaceMap = NamespaceMap {
    declarations: &[
        ("", "http://www.broservices.nl/xsd/isgmw/1.1"),
        ("brocom", BROCOM),
        ("gmwcom", "http://www.broservices.nl/xsd/gmwcommon/1.1"),
        ("gml", GML),
        ("xsi", XSI),
    ],
    schema_location: "http://www.broservices.nl/xsd/isgmw/1.1 https://schema.broservices.nl/xsd/isgmw/1.1/isgmw-messages.xsd",
};

static GLD: NamespaceMap = NamespaceMap {
    declarations: &[
        ("", "http://www.broservices.nl/xsd/isgld/1.0"),
        ("brocom", BROCOM),
        ("gldcom", "http://www.broservices.nl/xsd/gldcommon/1.0"),
        ("gml", GML),
        ("om", OM),
        ("swe", SWE),
        ("wml2", WATERML),
        ("xsi", XSI),
    ],
    schema_location: "http://www.broservices.nl/xsd/isgld/1.0 https://schema.broservices.nl/xsd/isgld/1.0/isgld-messages.xsd",
};

static GAR: NamespaceMap = NamespaceMap {
    declarations: &[
        ("", "http://www.broservices.nl/xsd/isgar/1.0"),
        ("brocom", BROCOM),
        ("garcom", "http://www.broservices.nl/xsd/garcommon/1.0"),
        ("gml", GML),
        ("xsi", XSI),
    ],
    schema_location: "http://www.broservices.nl/xsd/isgar/1.0 https://schema.broservices.nl/xsd/isgar/1.0/isgar-messages.xsd",
};

static FRD: NamespaceMap = NamespaceMap {
    declarations: &[
        ("", "http://www.broservices.nl/xsd/isfrd/1.0"),
        ("brocom", BROCOM),
        ("frdcom", "http://www.broservices.nl/xsd/frdcommon/1.0"),
        ("gml", GML),
        ("xsi", XSI),
    ],
    schema_location: "http://www.broservices.nl/xsd/isfrd/1.0 https://schema.broservices.nl/xsd/isfrd/1.0/isfrd-messages.xsd",
};

pub fn for_domain(domain: BroDomain) -> &'static NamespaceMap {
    match domain {
        BroDomain::Gmn => &GMN,
        BroDomain::Gmw => &GMW,
        BroDomain::Gld => &GLD,
        BroDomain::Gar => &GAR,
        BroDomain::Frd => &FRD,
    }
}

/// codeSpace URN for a GMN element, if the schema defines one.
pub fn gmn_codespace(element: &str) -> Option<&'static str> {
    match element {
        "deliveryContext" => Some("urn:bro:gmn:DeliveryContext"),
        "monitoringPurpose" => Some("urn:bro:gmn:MonitoringPurpose"),
        "groundwaterAspect" => Some("urn:bro:gmn:GroundwaterAspect"),
        _ => None,
    }
}

/// codeSpace URN for a GMW element, if the schema defines one.
pub fn gmw_codespace(element: &str) -> Option<&'static str> {
    match element {
        "deliveryContext" => Some("urn:bro:gmw:DeliveryContext"),
        "constructionStandard" => Some("urn:bro:gmw:ConstructionStandard"),
        "initialFunction" => Some("urn:bro:gmw:InitialFunction"),
        "wellHeadProtector" => Some("urn:bro:gmw:WellHeadProtector"),
        "horizontalPositioningMethod" => Some("urn:bro:gmw:HorizontalPositioningMethod"),
        "groundLevelPositioningMethod" => Some("urn:bro:gmw:GroundLevelPositioningMethod"),
        "tubeType" => Some("urn:bro:gmw:TubeType"),
        "tubeStatus" => Some("urn:bro:gmw:TubeStatus"),
        "tubeTopPositioningMethod" => Some("urn:bro:gmw:TubeTopPositioningMethod"),
        "tubePackingMaterial" => Some("urn:bro:gmw:TubePackingMaterial"),
        "tubeMaterial" => Some("urn:bro:gmw:TubeMaterial"),
        "glue" => Some("urn:bro:gmw:Glue"),
        "sockMaterial" => Some("urn:bro:gmw:SockMaterial"),
        "electrodePackingMaterial" => Some("urn:bro:gmw:ElectrodePackingMaterial"),
        "electrodeStatus" => Some("urn:bro:gmw:ElectrodeStatus"),
        "localVerticalReferencePoint" => Some("urn:bro:gmw:LocalVerticalReferencePoint"),
        "verticalDatum" => Some("urn:bro:gmw:VerticalDatum"),
        "wellStability" => Some("urn:bro:gmw:WellStability"),
        "correctionReason" => Some("urn:bro:gmw:CorrectionReason"),
        _ => None,
    }
}
