//! Error types module
//!
//! Every failure the delivery pipeline can hit is represented here, so that the
//! worker can translate any step's outcome into a terminal task state without
//! re-throwing raw transport or serialization errors.

use serde::{Deserialize, Serialize};

/// One structured validation complaint, either from payload construction or
/// from the registry's validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Flattens issues to the `"<path>: <message>"` lines shown to operators.
pub fn simplify_validation_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid payload at {field_path}: {reason}")]
    InvalidPayload { field_path: String, reason: String },

    #[error("De aangeleverde combinatie van request type en registratie type is niet mogelijk: {request_type} {registration_type}")]
    UnsupportedCombination {
        request_type: String,
        registration_type: String,
    },

    #[error("XML rendering failed: {0}")]
    XmlRender(String),

    #[error("Registry unreachable: {0}")]
    Transport(String),

    #[error("Het gebruikte token is niet gemachtigd voor project {project}")]
    Unauthorized { project: String },

    #[error("Het gebruikte token heeft niet de juiste rechten voor project {project}")]
    Forbidden { project: String },

    #[error("Document rejected by the registry")]
    BusinessValidation(Vec<ValidationIssue>),

    #[error("Delivery not terminal after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Unexpected registry response ({status}): {body}")]
    Unexpected { status: u16, body: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_payload(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidPayload {
            field_path: field_path.into(),
            reason: reason.into(),
        }
    }

    /// The operator-facing log line written into the task record.
    pub fn task_log(&self) -> String {
        match self {
            AppError::BusinessValidation(issues) => simplify_validation_issues(issues),
            AppError::PollTimeout { attempts } => format!(
                "Na {attempts} statuschecks is de levering nog niet afgerond. \
                 Controleer de levering handmatig in het Bronhouderportaal."
            ),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_joins_path_and_message() {
        let issues = vec![
            ValidationIssue::new("requestReference", "Field required"),
            ValidationIssue::new("qualityRegime", "Field required"),
        ];
        assert_eq!(
            simplify_validation_issues(&issues),
            "requestReference: Field required; qualityRegime: Field required"
        );
    }

    #[test]
    fn business_validation_log_uses_issues() {
        let err = AppError::BusinessValidation(vec![ValidationIssue::new(
            "sourceDocument",
            "ongeldig element",
        )]);
        assert_eq!(err.task_log(), "sourceDocument: ongeldig element");
    }

    #[test]
    fn poll_timeout_log_mentions_manual_check() {
        let err = AppError::PollTimeout { attempts: 4 };
        assert!(err.task_log().contains("handmatig"));
        assert!(err.task_log().contains('4'));
    }
}
