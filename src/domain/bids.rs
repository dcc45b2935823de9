//! Bid domain types
//!
//! A bid is a provider's priced offer against an open service request. Each
//! provider holds at most one live bid per request; re-bidding replaces the
//! previous offer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bid entity, embedded in the owning service request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub provider_id: Uuid,
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_avatar: Option<String>,
    pub offer_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for placing (or replacing) a bid
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceBidInput {
    pub provider_id: Uuid,
    pub provider_name: String,
    #[serde(default)]
    pub provider_avatar: Option<String>,
    pub offer_amount: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request DTO for accepting a bid, identified by its provider
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptBidInput {
    pub provider_id: Uuid,
}
