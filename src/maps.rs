//! Google Distance Matrix client.
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::distance::{Distance, DistanceService};
use crate::error::{MefmError, Result};
use crate::settings::MapsSettings;

pub struct GoogleMapsClient {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl GoogleMapsClient {
    pub fn new(settings: &MapsSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

impl DistanceService for GoogleMapsClient {
    // Blocking: callers on an async runtime must be on the blocking pool.
    fn distances(&self, origin: &str, destinations: &[String]) -> Result<Vec<Distance>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MefmError::Config("no distance matrix api key configured".into()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(external)?;
        let destinations_param = destinations.join("|");
        let body = client
            .get(&self.endpoint)
            .query(&[
                ("origins", origin),
                ("destinations", destinations_param.as_str()),
                ("key", api_key),
            ])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(external)?;
        parse_distance_matrix(&body, destinations.len())
    }
}

fn external(e: reqwest::Error) -> MefmError {
    warn!(error = %e, "distance matrix request failed");
    MefmError::ExternalService(e.to_string())
}

#[derive(Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixDistance>,
}

#[derive(Deserialize)]
struct MatrixDistance {
    text: String,
    value: u64,
}

/// Turns a Distance Matrix response for one origin into one [`Distance`] per
/// destination. Destinations the service could not place come back as
/// [`Distance::not_found`].
pub fn parse_distance_matrix(body: &str, expected: usize) -> Result<Vec<Distance>> {
    let response: MatrixResponse = serde_json::from_str(body)
        .map_err(|e| MefmError::ExternalService(format!("malformed distance matrix response: {e}")))?;
    if response.status != "OK" {
        return Err(MefmError::ExternalService(match response.error_message {
            Some(message) => format!("{}: {message}", response.status),
            None => response.status,
        }));
    }
    let elements = response
        .rows
        .into_iter()
        .next()
        .map(|row| row.elements)
        .unwrap_or_default();
    if elements.len() != expected {
        return Err(MefmError::ExternalService(format!(
            "expected {expected} distances, got {}",
            elements.len()
        )));
    }
    Ok(elements
        .into_iter()
        .map(|element| match (element.status.as_str(), element.distance) {
            ("OK", Some(distance)) => Distance {
                human_readable: distance.text,
                meters: Some(distance.value),
            },
            _ => Distance::not_found(),
        })
        .collect())
}
