//! Service request domain types
//!
//! A service request is a client-posted job description open for
//! competitive bidding. Bids are embedded in the request document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::bids::Bid;

/// Service request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    Booked,
    Cancelled,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Open => write!(f, "open"),
            RequestStatus::Booked => write!(f, "booked"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Service request entity
///
/// Transitions only out of `Open`: to `Booked` when a bid is accepted, or
/// to `Cancelled` when the client withdraws it. Both are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub address: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub offered_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub bids: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for publishing a service request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequestInput {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub address: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub offered_price: f64,
    #[serde(default)]
    pub comments: Option<String>,
}
