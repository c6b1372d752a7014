//! HTTP client for the Bronhouderportaal delivery API.
//!
//! The upload flow is four calls: validate, create upload, attach document,
//! create delivery; the fifth reads the delivery status. The trait exists so
//! the pipeline can run against a fake portal in tests.

use async_trait::async_trait;
use brohub_core::models::RegistryCredentials;
use brohub_core::{AppError, Config};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::delivery::{DeliveryStatus, ValidationOutcome};

const SERVICE_UNAVAILABLE: &str =
    "De BRO API is momenteel niet beschikbaar. Probeer het later opnieuw.";

#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// `POST {base}/api/v2/{project}/validatie` with the XML body.
    async fn validate_xml(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
        xml: &str,
    ) -> Result<ValidationOutcome, AppError>;

    /// `POST {base}/api/v2/{project}/uploads`; returns the upload URL from
    /// the Location header.
    async fn create_upload(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
    ) -> Result<String, AppError>;

    /// `POST <upload_url>/brondocumenten?filename=<label>` with the XML body.
    async fn attach_document(
        &self,
        upload_url: &str,
        credentials: &RegistryCredentials,
        xml: &str,
    ) -> Result<(), AppError>;

    /// `POST {base}/api/v2/{project}/leveringen`; returns the delivery URL.
    async fn create_delivery(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
        upload_url: &str,
    ) -> Result<String, AppError>;

    async fn check_delivery(
        &self,
        delivery_url: &str,
        credentials: &RegistryCredentials,
    ) -> Result<DeliveryStatus, AppError>;
}

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(RegistryClient {
            http,
            base_url: config.portal_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, project: &str, resource: &str) -> String {
        format!("{}/api/v2/{}/{}", self.base_url, project, resource)
    }

    /// The filename label the portal shows in its delivery overview.
    fn document_label() -> String {
        format!(
            "{}_BROHUB_request.xml",
            chrono::Utc::now().format("%Y%m%d%H%M%S")
        )
    }

    async fn ensure_success(
        &self,
        response: Response,
        project: &str,
    ) -> Result<Response, AppError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized {
                project: project.to_string(),
            }),
            StatusCode::FORBIDDEN => Err(AppError::Forbidden {
                project: project.to_string(),
            }),
            status if status.is_server_error() => {
                Err(AppError::Transport(SERVICE_UNAVAILABLE.to_string()))
            }
            status => Err(AppError::Unexpected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn transport(err: reqwest::Error) -> AppError {
    AppError::Transport(err.to_string())
}

fn location_header(response: &Response) -> Result<String, AppError> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::Transport("Portal response carried no Location header".to_string())
        })
}

/// The numeric id the portal appends to the upload URL; the delivery call
/// refers to the upload by this id.
pub fn upload_id_from_url(upload_url: &str) -> Result<i64, AppError> {
    upload_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|tail| tail.parse().ok())
        .ok_or_else(|| {
            AppError::Internal(format!("Upload URL has no numeric id: {}", upload_url))
        })
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn validate_xml(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
        xml: &str,
    ) -> Result<ValidationOutcome, AppError> {
        let url = self.project_url(project, "validatie");
        debug!(project, "validating document with portal");
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.token, Some(&credentials.password))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(xml.to_string())
            .send()
            .await
            .map_err(transport)?;
        let response = self.ensure_success(response, project).await?;
        response.json().await.map_err(transport)
    }

    async fn create_upload(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
    ) -> Result<String, AppError> {
        let url = self.project_url(project, "uploads");
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.token, Some(&credentials.password))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .send()
            .await
            .map_err(transport)?;
        let response = self.ensure_success(response, project).await?;
        location_header(&response)
    }

    async fn attach_document(
        &self,
        upload_url: &str,
        credentials: &RegistryCredentials,
        xml: &str,
    ) -> Result<(), AppError> {
        let url = format!("{}/brondocumenten", upload_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.token, Some(&credentials.password))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .query(&[("filename", Self::document_label())])
            .body(xml.to_string())
            .send()
            .await
            .map_err(transport)?;
        self.ensure_success(response, "").await?;
        Ok(())
    }

    async fn create_delivery(
        &self,
        project: &str,
        credentials: &RegistryCredentials,
        upload_url: &str,
    ) -> Result<String, AppError> {
        let upload_id = upload_id_from_url(upload_url)?;
        let url = self.project_url(project, "leveringen");
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.token, Some(&credentials.password))
            .json(&serde_json::json!({ "upload": upload_id }))
            .send()
            .await
            .map_err(transport)?;
        let response = self.ensure_success(response, project).await?;
        location_header(&response)
    }

    async fn check_delivery(
        &self,
        delivery_url: &str,
        credentials: &RegistryCredentials,
    ) -> Result<DeliveryStatus, AppError> {
        let response = self
            .http
            .get(delivery_url)
            .basic_auth(&credentials.token, Some(&credentials.password))
            .send()
            .await
            .map_err(transport)?;
        let response = self.ensure_success(response, "").await?;
        response.json().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_id_is_the_url_tail() {
        assert_eq!(
            upload_id_from_url("https://portal.example/api/v2/12/uploads/5634").unwrap(),
            5634
        );
        assert_eq!(
            upload_id_from_url("https://portal.example/api/v2/12/uploads/5634/").unwrap(),
            5634
        );
        assert!(upload_id_from_url("https://portal.example/api/v2/12/uploads/laatste").is_err());
    }

    #[test]
    fn document_label_shape() {
        let label = RegistryClient::document_label();
        assert!(label.ends_with("_BROHUB_request.xml"));
        assert_eq!(label.len(), "20240101120000_BROHUB_request.xml".len());
    }
}
