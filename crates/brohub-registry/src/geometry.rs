//! Best-effort well geometry lookup against the public BRO uitgifteservice.
//!
//! Used to fill in the plain tube part length for shortening and lengthening
//! events when the caller did not supply it. Any failure here is reported as
//! `Ok(None)` territory by the caller; the delivery proceeds without the
//! injected value.

use brohub_core::{AppError, Config};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct GeometryClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeometryClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(GeometryClient {
            http,
            base_url: config.geometry_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Screen top position of one tube of a registered well, in meters.
    /// The uitgifteservice is public; no credentials are needed.
    pub async fn screen_top_position(
        &self,
        bro_id: &str,
        tube_number: &str,
    ) -> Result<Option<f64>, AppError> {
        let url = format!("{}/gm/gmw/v1/objects/{}", self.base_url, bro_id);
        debug!(bro_id, tube_number, "looking up well geometry");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Geometry lookup for {} returned status {}",
                bro_id,
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        Ok(parse_screen_top_position(&body, tube_number))
    }
}

/// Scans a dispatch document for the tube with the given number and returns
/// its screen top position. Namespace prefixes vary per endpoint version, so
/// matching is on local names.
pub(crate) fn parse_screen_top_position(xml: &str, tube_number: &str) -> Option<f64> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current_element = String::new();
    let mut pending_number: Option<String> = None;
    let mut pending_position: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                current_element =
                    String::from_utf8_lossy(start.name().local_name().as_ref()).to_string();
            }
            Ok(Event::Text(text)) => {
                let value = match text.unescape() {
                    Ok(value) => value.trim().to_string(),
                    Err(_) => continue,
                };
                match current_element.as_str() {
                    "tubeNumber" => pending_number = Some(value),
                    "screenTopPosition" => pending_position = value.replace(',', ".").parse().ok(),
                    _ => {}
                }
            }
            Ok(Event::End(end)) => {
                let local = end.name().local_name().as_ref().to_ascii_lowercase();
                if local == b"monitoringtube" {
                    if pending_number.as_deref() == Some(tube_number) {
                        return pending_position;
                    }
                    pending_number = None;
                    pending_position = None;
                }
                current_element.clear();
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
