//! Booking lifecycle: status transitions, recurrence, triage-sorted views
//!
//! Status is the booking's contended field — a client cancelling while an
//! automated job completes the same booking — so every transition goes
//! through a version-guarded write that re-validates after losing a race.

use backoff::backoff::Backoff;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::bookings::{
    Booking, BookingStatus, BookingView, CreateBookingInput, RecurrenceType,
};
use crate::domain::reviews::{Review, SubmitRatingInput};
use crate::repo::{BookingRepository, CatalogRepository};
use crate::services::lookup::{
    ProfileLookup, ServiceCatalogLookup, UNKNOWN_PROVIDER, UNKNOWN_SERVICE,
};
use crate::store::{DocumentStore, StoreError};

use super::{recurrence, write_backoff, EngineError, EngineResult, WRITE_ATTEMPTS};

/// Warning attached to a [`StatusUpdateOutcome`] when a secondary effect of
/// the transition failed without rolling the transition back.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleWarning {
    /// The booking completed but its recurring successor could not be
    /// created.
    CompletedButRecurrenceFailed,
}

/// Result of a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdateOutcome {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    /// The successor booking spawned by completing a recurring booking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<LifecycleWarning>,
}

pub struct BookingLifecycleManager {
    bookings: BookingRepository,
    catalog: CatalogRepository,
    profiles: Arc<dyn ProfileLookup>,
    services: Arc<dyn ServiceCatalogLookup>,
}

fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Confirmed, InProgress) | (Confirmed, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
    )
}

impl BookingLifecycleManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        profiles: Arc<dyn ProfileLookup>,
        services: Arc<dyn ServiceCatalogLookup>,
    ) -> Self {
        Self {
            bookings: BookingRepository::new(store.clone()),
            catalog: CatalogRepository::new(store),
            profiles,
            services,
        }
    }

    /// Direct scheduling: the client books a known provider without going
    /// through bidding.
    pub async fn create_booking(&self, input: CreateBookingInput) -> EngineResult<Uuid> {
        if input.address.trim().is_empty() {
            return Err(EngineError::Validation("address is required".to_string()));
        }
        if !input.total_price.is_finite() || input.total_price <= 0.0 {
            return Err(EngineError::Validation(
                "total_price must be a positive amount".to_string(),
            ));
        }

        let booking = Booking {
            id: Uuid::nil(), // store-assigned on create
            user_id: input.user_id,
            provider_id: input.provider_id,
            service_id: input.service_id,
            service_name: input.service_name,
            schedule_time: input.schedule_time,
            total_price: input.total_price,
            address: input.address,
            custom_notes: input.custom_notes,
            source_request_id: None,
            recurrence_type: input.recurrence_type,
            status: BookingStatus::Confirmed,
            rating_submitted: false,
            rating_skipped: false,
            created_at: Utc::now(),
        };

        let id = self.bookings.create(&booking).await?;
        tracing::info!(
            booking_id = %id,
            user_id = %booking.user_id,
            provider_id = %booking.provider_id,
            schedule_time = %booking.schedule_time,
            recurrence = %booking.recurrence_type,
            "Booking created"
        );
        Ok(id)
    }

    /// Move a booking to `new_status`.
    ///
    /// Completing a recurring booking also materializes exactly one
    /// successor. Successor creation failing does not fail the completion;
    /// the outcome carries a distinguished warning instead.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> EngineResult<StatusUpdateOutcome> {
        let mut backoff = write_backoff();
        let mut attempt = 0;
        let prior = loop {
            attempt += 1;
            let (booking, version) = self.bookings.require(booking_id).await?;
            if !can_transition(booking.status, new_status) {
                return Err(EngineError::Conflict(format!(
                    "booking {} cannot move from {} to {}",
                    booking_id, booking.status, new_status
                )));
            }
            match self
                .bookings
                .set_status_checked(booking_id, version, new_status)
                .await
            {
                Ok(()) => break booking,
                Err(StoreError::Conflict { .. }) if attempt < WRITE_ATTEMPTS => {
                    tracing::debug!(
                        booking_id = %booking_id,
                        attempt,
                        "Status write lost the race, retrying"
                    );
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            booking_id = %booking_id,
            from = %prior.status,
            to = %new_status,
            "Booking status updated"
        );

        let mut outcome = StatusUpdateOutcome {
            booking_id,
            status: new_status,
            successor_id: None,
            warning: None,
        };

        if new_status == BookingStatus::Completed
            && prior.recurrence_type != RecurrenceType::None
        {
            match self.spawn_successor(&prior).await {
                Ok(successor_id) => outcome.successor_id = successor_id,
                Err(e) => {
                    tracing::warn!(
                        booking_id = %booking_id,
                        recurrence = %prior.recurrence_type,
                        error = %e,
                        "Booking completed but recurrence failed"
                    );
                    outcome.warning = Some(LifecycleWarning::CompletedButRecurrenceFailed);
                }
            }
        }

        Ok(outcome)
    }

    /// Materialize the single successor of a completed recurring booking.
    async fn spawn_successor(&self, completed: &Booking) -> EngineResult<Option<Uuid>> {
        let Some(next_time) =
            recurrence::next_occurrence(completed.schedule_time, completed.recurrence_type)
        else {
            return Ok(None);
        };

        let successor = Booking {
            id: Uuid::nil(), // store-assigned on create
            schedule_time: next_time,
            status: BookingStatus::Confirmed,
            // The successor is its own booking, not the settlement of the
            // original request.
            source_request_id: None,
            created_at: Utc::now(),
            ..completed.clone()
        };
        let successor_id = self.bookings.create(&successor).await?;

        tracing::info!(
            booking_id = %completed.id,
            successor_id = %successor_id,
            schedule_time = %next_time,
            recurrence = %completed.recurrence_type,
            "Recurring booking rescheduled"
        );
        Ok(Some(successor_id))
    }

    /// A client's bookings, triage-sorted and enriched with display names.
    ///
    /// Cancelled rows are excluded from the fetch; rated/skipped filtering
    /// is a presentation concern and happens downstream.
    pub async fn list_for_client(&self, user_id: Uuid) -> EngineResult<Vec<BookingView>> {
        let mut bookings = self
            .bookings
            .list_for_user(
                user_id,
                &[
                    BookingStatus::Confirmed,
                    BookingStatus::InProgress,
                    BookingStatus::Completed,
                ],
            )
            .await?;
        triage_sort(&mut bookings);
        Ok(self.enrich(bookings).await)
    }

    /// A provider's active jobs, most recently scheduled first.
    pub async fn list_for_provider(&self, provider_id: Uuid) -> EngineResult<Vec<BookingView>> {
        let mut bookings = self
            .bookings
            .list_for_provider(
                provider_id,
                &[BookingStatus::Confirmed, BookingStatus::InProgress],
            )
            .await?;
        bookings.sort_by(|a, b| b.schedule_time.cmp(&a.schedule_time));
        Ok(self.enrich(bookings).await)
    }

    /// Rate a completed booking: writes the review and marks the booking
    /// rated.
    pub async fn submit_rating(
        &self,
        booking_id: Uuid,
        input: SubmitRatingInput,
    ) -> EngineResult<Uuid> {
        if !(1.0..=5.0).contains(&input.rating) {
            return Err(EngineError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let (booking, _) = self.bookings.require(booking_id).await?;
        if booking.status != BookingStatus::Completed {
            return Err(EngineError::Conflict(format!(
                "booking {} is {}, only completed bookings can be rated",
                booking_id, booking.status
            )));
        }
        if booking.rating_submitted {
            return Err(EngineError::Conflict(format!(
                "booking {} has already been rated",
                booking_id
            )));
        }

        let review = Review {
            id: Uuid::nil(), // store-assigned on create
            provider_id: booking.provider_id,
            client_id: booking.user_id,
            booking_id,
            rating: input.rating,
            comment: input.comment,
            created_at: Utc::now(),
        };
        let review_id = self.catalog.create_review(&review).await?;
        self.bookings.mark_rating_submitted(booking_id).await?;

        tracing::info!(
            booking_id = %booking_id,
            review_id = %review_id,
            rating = input.rating,
            "Rating submitted"
        );
        Ok(review_id)
    }

    /// Dismiss the rating prompt for a completed booking.
    pub async fn skip_rating(&self, booking_id: Uuid) -> EngineResult<()> {
        let (booking, _) = self.bookings.require(booking_id).await?;
        if booking.status != BookingStatus::Completed {
            return Err(EngineError::Conflict(format!(
                "booking {} is {}, only completed bookings can skip rating",
                booking_id, booking.status
            )));
        }
        self.bookings.mark_rating_skipped(booking_id).await?;
        tracing::info!(booking_id = %booking_id, "Rating skipped");
        Ok(())
    }

    /// Attach provider/service display names. Distinct ids are fetched once
    /// per call; misses degrade to placeholder names and never fail the
    /// listing.
    async fn enrich(&self, bookings: Vec<Booking>) -> Vec<BookingView> {
        let provider_ids: Vec<Uuid> = bookings
            .iter()
            .map(|b| b.provider_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let service_ids: Vec<Uuid> = bookings
            .iter()
            .map(|b| b.service_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (provider_names, service_names): (HashMap<Uuid, String>, HashMap<Uuid, String>) = tokio::join!(
            self.profiles.display_names(&provider_ids),
            self.services.service_names(&service_ids),
        );

        bookings
            .into_iter()
            .map(|booking| {
                let provider_name = provider_names
                    .get(&booking.provider_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string());
                let service_name = service_names
                    .get(&booking.service_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());
                BookingView::from_parts(booking, provider_name, service_name)
            })
            .collect()
    }
}

/// Display ordering: active bookings (confirmed/in-progress) lead, soonest
/// first; history follows, most recent first, completed before cancelled.
/// The flipped sort direction between the two bands is a deliberate display
/// rule, not an accident.
fn triage_sort(bookings: &mut [Booking]) {
    fn rank(status: BookingStatus) -> u8 {
        match status {
            BookingStatus::Confirmed => 1,
            BookingStatus::InProgress => 2,
            BookingStatus::Completed => 3,
            BookingStatus::Cancelled => 4,
        }
    }

    // Confirmed and in-progress share the upcoming band.
    fn band(status: BookingStatus) -> u8 {
        let r = rank(status);
        if r <= 2 {
            0
        } else {
            r
        }
    }

    bookings.sort_by(|a, b| {
        let (band_a, band_b) = (band(a.status), band(b.status));
        band_a.cmp(&band_b).then_with(|| {
            if band_a == 0 {
                a.schedule_time
                    .cmp(&b.schedule_time)
                    .then_with(|| rank(a.status).cmp(&rank(b.status)))
            } else {
                b.schedule_time.cmp(&a.schedule_time)
            }
        })
    });
}
