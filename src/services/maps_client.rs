//! Distance/ETA client
//!
//! Talks to the Google Distance Matrix and Geocoding APIs. The engine only
//! sees the [`DistanceEstimator`] trait; live tracking calls it reactively
//! as fresh coordinates arrive.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::domain::location::{EtaEstimate, GeoPoint};
use crate::error::ApiError;

/// Stateless travel-estimate collaborator.
#[async_trait]
pub trait DistanceEstimator: Send + Sync {
    async fn eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<EtaEstimate, EstimatorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("distance estimator is not configured")]
    NotConfigured,

    #[error("no route between the given points: {0}")]
    NoRoute(String),

    #[error("distance estimator unavailable: {0}")]
    Unavailable(String),
}

impl From<EstimatorError> for ApiError {
    fn from(e: EstimatorError) -> Self {
        match e {
            EstimatorError::NoRoute(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(anyhow::anyhow!(other)),
        }
    }
}

/// Client for the Google Maps web services.
#[derive(Clone)]
pub struct MapsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    duration: Option<TextValue>,
    distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

impl MapsClient {
    /// Create a new maps client. An empty api key builds a client that
    /// reports `NotConfigured` on every call, so the rest of the system
    /// works without maps credentials.
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        if api_key.is_empty() {
            tracing::warn!("Maps API key is not set; ETA lookups will be unavailable");
        } else {
            tracing::info!(base_url = base_url, "Maps client initialized");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, EstimatorError> {
        let url = format!("{}{}", self.base_url, path);
        Url::parse_with_params(&url, params)
            .map_err(|e| EstimatorError::Unavailable(format!("invalid maps URL: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, EstimatorError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EstimatorError::Unavailable(e.to_string()))?;
        response
            .json::<T>()
            .await
            .map_err(|e| EstimatorError::Unavailable(format!("invalid maps response: {e}")))
    }

    /// Convert a human-readable address into coordinates.
    pub async fn geocode(&self, address: &str) -> Result<GeoPoint, EstimatorError> {
        if self.api_key.is_empty() {
            return Err(EstimatorError::NotConfigured);
        }

        let url = self.endpoint(
            "/geocode/json",
            &[
                ("address", address.to_string()),
                ("key", self.api_key.clone()),
            ],
        )?;
        let body: GeocodeResponse = self.get_json(url).await?;

        if body.status != "OK" {
            return Err(EstimatorError::NoRoute(
                body.error_message
                    .unwrap_or_else(|| format!("geocoding failed: {}", body.status)),
            ));
        }
        let result = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| EstimatorError::NoRoute("geocoding returned no results".to_string()))?;

        Ok(GeoPoint {
            latitude: result.geometry.location.lat,
            longitude: result.geometry.location.lng,
        })
    }
}

#[async_trait]
impl DistanceEstimator for MapsClient {
    async fn eta(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<EtaEstimate, EstimatorError> {
        if self.api_key.is_empty() {
            return Err(EstimatorError::NotConfigured);
        }

        let url = self.endpoint(
            "/distancematrix/json",
            &[
                ("units", "metric".to_string()),
                (
                    "origins",
                    format!("{},{}", origin.latitude, origin.longitude),
                ),
                (
                    "destinations",
                    format!("{},{}", destination.latitude, destination.longitude),
                ),
                ("key", self.api_key.clone()),
            ],
        )?;
        let body: DistanceMatrixResponse = self.get_json(url).await?;

        if body.status != "OK" {
            return Err(EstimatorError::Unavailable(
                body.error_message
                    .unwrap_or_else(|| format!("distance matrix status: {}", body.status)),
            ));
        }

        let element = body
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| {
                EstimatorError::Unavailable("distance matrix returned no elements".to_string())
            })?;

        if element.status != "OK" {
            return Err(EstimatorError::NoRoute(format!(
                "element status: {}",
                element.status
            )));
        }

        match (element.duration, element.distance) {
            (Some(duration), Some(distance)) => Ok(EtaEstimate {
                duration_text: duration.text,
                distance_text: distance.text,
            }),
            _ => Err(EstimatorError::Unavailable(
                "distance matrix element missing duration/distance".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_distance_matrix_payload() {
        let payload = r#"{
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "duration": { "text": "15 mins", "value": 900 },
                    "distance": { "text": "5.2 km", "value": 5200 }
                }]
            }]
        }"#;
        let parsed: DistanceMatrixResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.status, "OK");
        let element = &parsed.rows[0].elements[0];
        assert_eq!(element.duration.as_ref().unwrap().text, "15 mins");
        assert_eq!(element.distance.as_ref().unwrap().text, "5.2 km");
    }

    #[test]
    fn parses_geocode_payload() {
        let payload = r#"{
            "status": "OK",
            "results": [{
                "geometry": { "location": { "lat": 33.7, "lng": 73.1 } }
            }]
        }"#;
        let parsed: GeocodeResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.results[0].geometry.location.lat, 33.7);
    }

    #[tokio::test]
    async fn unconfigured_client_reports_not_configured() {
        let client = MapsClient::new("https://maps.example.com/api", "", 5).unwrap();
        let origin = GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        let result = client.eta(origin, origin).await;
        assert!(matches!(result, Err(EstimatorError::NotConfigured)));
    }
}
