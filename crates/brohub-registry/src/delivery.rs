//! Delivery status as reported by the Bronhouderportaal.

use serde::Deserialize;

/// Status payload for one delivery, `GET <delivery_url>`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryStatus {
    pub status: String,
    #[serde(default)]
    pub brondocuments: Vec<BronDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BronDocument {
    pub status: String,
    #[serde(rename = "broId", default)]
    pub bro_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl DeliveryStatus {
    /// The delivery is done once the portal forwarded it and the national
    /// registry took the document in without errors.
    pub fn is_complete(&self) -> bool {
        self.status == "DOORGELEVERD"
            && self
                .brondocuments
                .first()
                .is_some_and(|doc| doc.status == "OPGENOMEN_LVBRO" && doc.errors.is_empty())
    }

    pub fn has_errors(&self) -> bool {
        self.brondocuments.iter().any(|doc| !doc.errors.is_empty())
    }

    pub fn errors(&self) -> Vec<String> {
        self.brondocuments
            .iter()
            .flat_map(|doc| doc.errors.iter().cloned())
            .collect()
    }

    /// BRO id assigned to the first document, once known.
    pub fn bro_id(&self) -> Option<&str> {
        self.brondocuments
            .first()
            .and_then(|doc| doc.bro_id.as_deref())
    }
}

/// Validation outcome, `POST .../validatie`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationOutcome {
    pub status: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.status == "VALIDE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: serde_json::Value) -> DeliveryStatus {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn complete_requires_both_statuses_and_no_errors() {
        let delivered = status(json!({
            "status": "DOORGELEVERD",
            "brondocuments": [{"status": "OPGENOMEN_LVBRO", "broId": "GMN000000000001", "errors": []}],
        }));
        assert!(delivered.is_complete());
        assert_eq!(delivered.bro_id(), Some("GMN000000000001"));

        let forwarded_only = status(json!({
            "status": "DOORGELEVERD",
            "brondocuments": [{"status": "GELEVERD", "errors": []}],
        }));
        assert!(!forwarded_only.is_complete());

        let with_errors = status(json!({
            "status": "DOORGELEVERD",
            "brondocuments": [{"status": "OPGENOMEN_LVBRO", "errors": ["afgekeurd"]}],
        }));
        assert!(!with_errors.is_complete());
        assert!(with_errors.has_errors());
        assert_eq!(with_errors.errors(), vec!["afgekeurd".to_string()]);
    }

    #[test]
    fn missing_documents_is_not_complete() {
        let pending = status(json!({"status": "AANGELEVERD"}));
        assert!(!pending.is_complete());
        assert!(pending.bro_id().is_none());
    }

    #[test]
    fn validation_outcome_parses() {
        let outcome: ValidationOutcome =
            serde_json::from_value(json!({"status": "VALIDE"})).unwrap();
        assert!(outcome.is_valid());

        let outcome: ValidationOutcome = serde_json::from_value(
            json!({"status": "NIET-VALIDE", "errors": ["regel 12: element ontbreekt"]}),
        )
        .unwrap();
        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors.len(), 1);
    }
}
