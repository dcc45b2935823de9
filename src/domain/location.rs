//! Live-location and ETA types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic coordinate pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A provider's live position; last write wins, no history retained
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub last_updated: DateTime<Utc>,
}

impl ProviderLocation {
    pub fn coords(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Request DTO for publishing a position fix
#[derive(Debug, Clone, Deserialize)]
pub struct PublishLocationInput {
    pub latitude: f64,
    pub longitude: f64,
}

/// Travel estimate between two points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EtaEstimate {
    /// Human-readable duration, e.g. "15 mins"
    pub duration_text: String,
    /// Human-readable distance, e.g. "5.2 km"
    pub distance_text: String,
}
