//! Request negotiation: creation, bidding, acceptance
//!
//! The request state machine: `open` accepts bids until the client either
//! accepts one (`booked`) or withdraws the request (`cancelled`). Bid
//! writes are read-modify-write over the embedded array, so they run under
//! the store's version guard with a bounded retry — two providers bidding
//! at once must both land.

use backoff::backoff::Backoff;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::bids::{Bid, PlaceBidInput};
use crate::domain::bookings::{Booking, BookingStatus, RecurrenceType};
use crate::domain::requests::{CreateServiceRequestInput, RequestStatus, ServiceRequest};
use crate::repo::{BidLedger, BookingRepository, RequestRepository};
use crate::store::{DocumentStore, StoreError};

use super::{write_backoff, EngineError, EngineResult, WRITE_ATTEMPTS};

/// Warning attached to an [`AcceptOutcome`] when the secondary write lagged
/// behind the booking creation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationWarning {
    /// The booking exists but the request could not be flipped to booked.
    /// Recover by re-running the flip, never by recreating the booking.
    RequestStillOpen,
}

/// Result of accepting a bid. Booking creation is the primary effect; the
/// request flip may transiently lag it, reported here rather than failing
/// the call.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub booking_id: Uuid,
    pub request_booked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<NegotiationWarning>,
}

pub struct NegotiationEngine {
    requests: RequestRepository,
    bids: BidLedger,
    bookings: BookingRepository,
}

impl NegotiationEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            requests: RequestRepository::new(store.clone()),
            bids: BidLedger::new(store.clone()),
            bookings: BookingRepository::new(store),
        }
    }

    /// Publish a new service request. Validation happens before any I/O.
    pub async fn create_request(&self, input: CreateServiceRequestInput) -> EngineResult<Uuid> {
        if input.address.trim().is_empty() {
            return Err(EngineError::Validation("address is required".to_string()));
        }
        if input.end_time <= input.start_time {
            return Err(EngineError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }
        if !input.offered_price.is_finite() || input.offered_price <= 0.0 {
            return Err(EngineError::Validation(
                "offered_price must be a positive amount".to_string(),
            ));
        }

        let request = ServiceRequest {
            id: Uuid::nil(), // store-assigned on create
            client_id: input.client_id,
            service_id: input.service_id,
            service_name: input.service_name,
            address: input.address,
            start_time: input.start_time,
            end_time: input.end_time,
            offered_price: input.offered_price,
            comments: input.comments,
            status: RequestStatus::Open,
            bids: Vec::new(),
            booked_by: None,
            created_at: Utc::now(),
        };

        let id = self.requests.create(&request).await?;
        tracing::info!(
            request_id = %id,
            client_id = %request.client_id,
            service_name = %request.service_name,
            "Service request created"
        );
        Ok(id)
    }

    /// Place or replace a provider's bid on an open request.
    ///
    /// A provider has exactly one live bid per request; bidding again
    /// replaces the previous offer. Lost races against other writers are
    /// retried from a fresh read.
    pub async fn place_bid(&self, request_id: Uuid, input: PlaceBidInput) -> EngineResult<()> {
        if !input.offer_amount.is_finite() || input.offer_amount <= 0.0 {
            return Err(EngineError::Validation(
                "offer_amount must be a positive amount".to_string(),
            ));
        }

        let mut backoff = write_backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (request, version) = self.requests.require(request_id).await?;
            if request.status != RequestStatus::Open {
                return Err(EngineError::Conflict(format!(
                    "request {} is no longer accepting bids (status: {})",
                    request_id, request.status
                )));
            }

            let bid = Bid {
                provider_id: input.provider_id,
                provider_name: input.provider_name.clone(),
                provider_avatar: input.provider_avatar.clone(),
                offer_amount: input.offer_amount,
                comment: input.comment.clone(),
                created_at: Utc::now(),
            };

            match self
                .bids
                .upsert_bid(request_id, version, request.bids, bid)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        request_id = %request_id,
                        provider_id = %input.provider_id,
                        offer_amount = input.offer_amount,
                        "Bid placed"
                    );
                    return Ok(());
                }
                Err(StoreError::Conflict { .. }) if attempt < WRITE_ATTEMPTS => {
                    tracing::debug!(
                        request_id = %request_id,
                        provider_id = %input.provider_id,
                        attempt,
                        "Bid write lost the race, retrying"
                    );
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Accept a provider's bid: create the confirmed booking, then flip the
    /// request to booked.
    ///
    /// Writes are ordered booking-first so a reader never observes a booked
    /// request without its booking; the inverse (booking exists, request
    /// still open) is a tolerated transient reported via the outcome's
    /// warning.
    pub async fn accept_bid(
        &self,
        request_id: Uuid,
        provider_id: Uuid,
    ) -> EngineResult<AcceptOutcome> {
        let (request, _) = self.requests.require(request_id).await?;
        if request.status != RequestStatus::Open {
            return Err(EngineError::Conflict(format!(
                "request {} is already {}",
                request_id, request.status
            )));
        }
        let bid = request
            .bids
            .iter()
            .find(|b| b.provider_id == provider_id)
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "no bid from provider {} on request {}",
                    provider_id, request_id
                ))
            })?;

        // A booking may already exist if a previous acceptance created it
        // but failed to flip the request. Reconcile by reusing it — never
        // by minting a second booking.
        let booking_id = match self.bookings.find_by_source_request(request_id).await? {
            Some(existing) if existing.provider_id == provider_id => {
                tracing::info!(
                    request_id = %request_id,
                    booking_id = %existing.id,
                    "Reusing booking from an earlier interrupted acceptance"
                );
                existing.id
            }
            Some(existing) => {
                return Err(EngineError::Conflict(format!(
                    "request {} was already settled by booking {} for provider {}",
                    request_id, existing.id, existing.provider_id
                )));
            }
            None => {
                let booking = Booking {
                    id: Uuid::nil(), // store-assigned on create
                    user_id: request.client_id,
                    provider_id: bid.provider_id,
                    service_id: request.service_id,
                    service_name: request.service_name.clone(),
                    schedule_time: request.start_time,
                    total_price: bid.offer_amount,
                    address: request.address.clone(),
                    custom_notes: request.comments.clone(),
                    source_request_id: Some(request_id),
                    recurrence_type: RecurrenceType::None,
                    status: BookingStatus::Confirmed,
                    rating_submitted: false,
                    rating_skipped: false,
                    created_at: Utc::now(),
                };
                self.bookings.create(&booking).await?
            }
        };

        match self.flip_to_booked(request_id, provider_id).await {
            Ok(()) => {
                tracing::info!(
                    request_id = %request_id,
                    booking_id = %booking_id,
                    provider_id = %provider_id,
                    "Bid accepted"
                );
                Ok(AcceptOutcome {
                    booking_id,
                    request_booked: true,
                    warning: None,
                })
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    booking_id = %booking_id,
                    error = %e,
                    "Booking created but request flip failed; request left open"
                );
                Ok(AcceptOutcome {
                    booking_id,
                    request_booked: false,
                    warning: Some(NegotiationWarning::RequestStillOpen),
                })
            }
        }
    }

    /// Retry the open -> booked flip from a fresh read each attempt, so a
    /// concurrent bid write cannot starve the acceptance.
    async fn flip_to_booked(&self, request_id: Uuid, provider_id: Uuid) -> EngineResult<()> {
        let mut backoff = write_backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (request, version) = self.requests.require(request_id).await?;
            if request.status == RequestStatus::Booked {
                return Ok(());
            }
            match self
                .requests
                .set_status_checked(request_id, version, RequestStatus::Booked, Some(provider_id))
                .await
            {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict { .. }) if attempt < WRITE_ATTEMPTS => {
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Withdraw an open request. Cancelling an already-cancelled request is
    /// a no-op; a booked request cannot be withdrawn.
    pub async fn cancel_request(&self, request_id: Uuid) -> EngineResult<()> {
        let mut backoff = write_backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (request, version) = self.requests.require(request_id).await?;
            match request.status {
                RequestStatus::Cancelled => return Ok(()),
                RequestStatus::Booked => {
                    return Err(EngineError::Conflict(format!(
                        "request {} is already booked",
                        request_id
                    )));
                }
                RequestStatus::Open => {}
            }
            match self
                .requests
                .set_status_checked(request_id, version, RequestStatus::Cancelled, None)
                .await
            {
                Ok(()) => {
                    tracing::info!(request_id = %request_id, "Service request cancelled");
                    return Ok(());
                }
                Err(StoreError::Conflict { .. }) if attempt < WRITE_ATTEMPTS => {
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// All requests currently accepting bids, for the provider job board.
    pub async fn list_open_requests(&self) -> EngineResult<Vec<ServiceRequest>> {
        Ok(self.requests.list_open().await?)
    }

    /// A client's own open requests. The store already filters by client;
    /// the status filter is re-applied here in case the index lags a
    /// just-booked request.
    pub async fn list_client_requests(&self, client_id: Uuid) -> EngineResult<Vec<ServiceRequest>> {
        let mut requests = self.requests.list_for_client(client_id).await?;
        requests.retain(|r| r.status == RequestStatus::Open);
        Ok(requests)
    }
}
