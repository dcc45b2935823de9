//! Request–bid–booking lifecycle engine
//!
//! [`NegotiationEngine`] drives a service request from creation through
//! bidding to acceptance; [`BookingLifecycleManager`] drives the resulting
//! booking through execution, completion, and recurrence. Both mutate their
//! contended documents through version-guarded writes with a bounded retry.

use std::time::Duration;

use backoff::ExponentialBackoff;

pub mod lifecycle;
pub mod negotiation;
pub mod recurrence;

pub use lifecycle::{BookingLifecycleManager, LifecycleWarning, StatusUpdateOutcome};
pub use negotiation::{AcceptOutcome, NegotiationEngine, NegotiationWarning};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { ref collection, id } => {
                Self::NotFound(format!("{} {} does not exist", entity_name(collection), id))
            }
            other => Self::Store(other),
        }
    }
}

fn entity_name(collection: &str) -> &str {
    match collection {
        "service_requests" => "service request",
        "bookings" => "booking",
        _ => "document",
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Attempts for a version-guarded write before giving up on the race.
pub(crate) const WRITE_ATTEMPTS: u32 = 3;

/// Backoff between conflicting write attempts. Short intervals: conflicts
/// come from other request handlers, not from slow infrastructure.
pub(crate) fn write_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(20),
        max_interval: Duration::from_millis(200),
        multiplier: 2.0,
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}
