//! Service catalog and provider directory types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reviews::Review;

/// A bookable service from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A user document from the profile collection
///
/// Only the fields the directory needs; profile management itself is
/// upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub skills: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A provider as listed for a service, with aggregated review rating
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub average_rating: f64,
    /// "4.7 (12)" once reviewed, "New" until then
    pub rating_text: String,
    pub review_count: usize,
}

impl ProviderSummary {
    pub fn from_profile(profile: UserProfile, reviews: &[Review]) -> Self {
        let average = Review::average(reviews);
        let rating_text = match average {
            Some(avg) => format!("{:.1} ({})", avg, reviews.len()),
            None => "New".to_string(),
        };
        Self {
            id: profile.id,
            name: profile.name,
            avatar_url: profile.avatar_url,
            average_rating: average.unwrap_or(0.0),
            rating_text,
            review_count: reviews.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(rating: f64) -> Review {
        Review {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            rating,
            comment: None,
            created_at: Utc::now(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: "Amina".to_string(),
            role: Some("provider".to_string()),
            skills: vec![],
            avatar_url: None,
        }
    }

    #[test]
    fn unreviewed_provider_reads_new() {
        let summary = ProviderSummary::from_profile(profile(), &[]);
        assert_eq!(summary.rating_text, "New");
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.review_count, 0);
    }

    #[test]
    fn rating_text_includes_count() {
        let summary = ProviderSummary::from_profile(profile(), &[review(5.0), review(4.0)]);
        assert_eq!(summary.rating_text, "4.5 (2)");
        assert_eq!(summary.average_rating, 4.5);
    }
}
