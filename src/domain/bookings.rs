//! Booking domain types
//!
//! A booking is a confirmed, scheduled job, created either by direct
//! scheduling or by accepting a bid on a service request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking status
///
/// `confirmed -> in-progress -> completed`, with `cancelled` reachable from
/// the two active states. `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::InProgress => write!(f, "in-progress"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How often a booking repeats after completion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Default for RecurrenceType {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceType::None => write!(f, "none"),
            RecurrenceType::Daily => write!(f, "daily"),
            RecurrenceType::Weekly => write!(f, "weekly"),
            RecurrenceType::Monthly => write!(f, "monthly"),
        }
    }
}

/// Booking entity
///
/// Never hard-deleted; terminal rows stay for history and are filtered out
/// of active views by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub schedule_time: DateTime<Utc>,
    pub total_price: f64,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_notes: Option<String>,
    /// The service request this booking settled, when it came out of a
    /// bidding round. Acceptance is re-runnable because of this link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_request_id: Option<Uuid>,
    #[serde(default)]
    pub recurrence_type: RecurrenceType,
    pub status: BookingStatus,
    #[serde(default)]
    pub rating_submitted: bool,
    #[serde(default)]
    pub rating_skipped: bool,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for direct scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingInput {
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub schedule_time: DateTime<Utc>,
    pub total_price: f64,
    pub address: String,
    #[serde(default)]
    pub custom_notes: Option<String>,
    #[serde(default)]
    pub recurrence_type: RecurrenceType,
}

/// Request DTO for a status transition
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusInput {
    pub status: BookingStatus,
}

/// Booking enriched with display names for list views
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub schedule_time: DateTime<Utc>,
    pub total_price: f64,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_notes: Option<String>,
    pub recurrence_type: RecurrenceType,
    pub status: BookingStatus,
    pub rating_submitted: bool,
    pub rating_skipped: bool,
}

impl BookingView {
    pub fn from_parts(booking: Booking, provider_name: String, service_name: String) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            provider_id: booking.provider_id,
            provider_name,
            service_id: booking.service_id,
            service_name,
            schedule_time: booking.schedule_time,
            total_price: booking.total_price,
            address: booking.address,
            custom_notes: booking.custom_notes,
            recurrence_type: booking.recurrence_type,
            status: booking.status,
            rating_submitted: booking.rating_submitted,
            rating_skipped: booking.rating_skipped,
        }
    }
}
