//! Provider review types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client's review of a provider, tied to a completed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub booking_id: Uuid,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Mean rating across reviews, `None` when there are none.
    pub fn average(reviews: &[Review]) -> Option<f64> {
        if reviews.is_empty() {
            return None;
        }
        let total: f64 = reviews.iter().map(|r| r.rating).sum();
        Some(total / reviews.len() as f64)
    }
}

/// Request DTO for submitting a rating on a completed booking
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRatingInput {
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
}
