//! Lenient scalar handling for user-supplied source documents.
//!
//! Spreadsheet exports hand us numbers where we expect strings and strings
//! where we expect numbers. `Scalar` keeps whatever JSON form came in so a
//! document round-trips unchanged, while still rendering to a single text
//! form for XML.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A value that may arrive as a JSON string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Text form used by the XML renderer.
    pub fn render(&self) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) => v.to_string(),
            Scalar::Text(v) => v.trim().to_string(),
        }
    }

    /// Numeric value, accepting a comma as decimal separator in text form.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(v) => v.trim().replace(',', ".").parse().ok(),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

/// Treats `""`, `"None"` and `"null"` as absent. Spreadsheet columns produce
/// these for cells the user left empty.
pub fn normalize_optional(value: &mut Option<String>) {
    if let Some(s) = value {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "None" || trimmed == "null" {
            *value = None;
        } else if trimmed.len() != s.len() {
            *value = Some(trimmed.to_string());
        }
    }
}

/// Default for Dutch yes/no/unknown columns.
pub fn onbekend() -> String {
    "onbekend".to_string()
}

/// Fixed-precision text form, used where the registry schema expects a
/// decimal with a set number of places.
pub fn format_decimal(value: f64, places: usize) -> String {
    format!("{:.*}", places, value)
}
