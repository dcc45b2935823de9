//! Booking lifecycle integration tests: transitions, recurrence, triage
//! ordering, enrichment, and rating against the in-memory store.

mod helpers;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use helpers::{at, seed_service, seed_user, FaultyStore};
use servilink_backend::domain::bookings::{BookingStatus, CreateBookingInput, RecurrenceType};
use servilink_backend::domain::reviews::SubmitRatingInput;
use servilink_backend::engine::{BookingLifecycleManager, EngineError, LifecycleWarning};
use servilink_backend::repo::BookingRepository;
use servilink_backend::services::StoreLookup;
use servilink_backend::store::{DocumentStore, MemoryStore};

fn manager_over(store: Arc<dyn DocumentStore>) -> BookingLifecycleManager {
    let lookup = Arc::new(StoreLookup::new(store.clone(), None));
    BookingLifecycleManager::new(store, lookup.clone(), lookup)
}

fn setup() -> (BookingLifecycleManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (manager_over(store.clone()), store)
}

fn booking_input(
    user_id: Uuid,
    provider_id: Uuid,
    service_id: Uuid,
    schedule_time: DateTime<Utc>,
    recurrence_type: RecurrenceType,
) -> CreateBookingInput {
    CreateBookingInput {
        user_id,
        provider_id,
        service_id,
        service_name: "House Cleaning".to_string(),
        schedule_time,
        total_price: 60.0,
        address: "12 Garden Road".to_string(),
        custom_notes: None,
        recurrence_type,
    }
}

/// Drive a confirmed booking to the target status through legal steps.
async fn drive_to(manager: &BookingLifecycleManager, booking_id: Uuid, target: BookingStatus) {
    match target {
        BookingStatus::Confirmed => {}
        BookingStatus::InProgress | BookingStatus::Cancelled => {
            manager.update_status(booking_id, target).await.unwrap();
        }
        BookingStatus::Completed => {
            manager
                .update_status(booking_id, BookingStatus::InProgress)
                .await
                .unwrap();
            manager
                .update_status(booking_id, BookingStatus::Completed)
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
async fn direct_scheduling_creates_a_confirmed_booking() {
    let (manager, store) = setup();
    let user = Uuid::new_v4();

    let id = manager
        .create_booking(booking_input(
            user,
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::Weekly,
        ))
        .await
        .unwrap();

    let bookings = BookingRepository::new(store);
    let (booking, _) = bookings.require(id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.recurrence_type, RecurrenceType::Weekly);
    assert!(!booking.rating_submitted);
    assert!(!booking.rating_skipped);
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let (manager, _) = setup();
    let id = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();

    // Confirmed bookings must be started before completion.
    let err = manager
        .update_status(id, BookingStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    drive_to(&manager, id, BookingStatus::Completed).await;

    // Completed is terminal.
    for target in [
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Cancelled,
    ] {
        let err = manager.update_status(id, target).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }
}

#[tokio::test]
async fn cancelled_is_terminal() {
    let (manager, _) = setup();
    let id = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();

    manager
        .update_status(id, BookingStatus::Cancelled)
        .await
        .unwrap();
    let err = manager
        .update_status(id, BookingStatus::InProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn completing_a_weekly_booking_spawns_exactly_one_successor() {
    let (manager, store) = setup();
    let user = Uuid::new_v4();

    let id = manager
        .create_booking(booking_input(
            user,
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 3, 10, 9, 0),
            RecurrenceType::Weekly,
        ))
        .await
        .unwrap();

    manager
        .update_status(id, BookingStatus::InProgress)
        .await
        .unwrap();
    let outcome = manager
        .update_status(id, BookingStatus::Completed)
        .await
        .unwrap();

    let successor_id = outcome.successor_id.expect("successor scheduled");
    assert!(outcome.warning.is_none());

    let bookings = BookingRepository::new(store.clone());
    let (successor, _) = bookings.require(successor_id).await.unwrap();
    assert_eq!(successor.status, BookingStatus::Confirmed);
    assert_eq!(successor.schedule_time, at(2025, 3, 17, 9, 0));
    assert_eq!(successor.recurrence_type, RecurrenceType::Weekly);
    assert_eq!(successor.user_id, user);
    assert_eq!(successor.total_price, 60.0);

    // The original stays completed, untouched by the spawn.
    let (original, _) = bookings.require(id).await.unwrap();
    assert_eq!(original.status, BookingStatus::Completed);

    // Exactly one successor: two bookings in total.
    let docs = store.query("bookings", &[]).await.unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn completing_a_non_recurring_booking_spawns_nothing() {
    let (manager, store) = setup();
    let id = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 3, 10, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();

    drive_to(&manager, id, BookingStatus::Completed).await;

    let docs = store.query("bookings", &[]).await.unwrap();
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn recurrence_failure_warns_without_blocking_completion() {
    let store = FaultyStore::new();
    let manager = manager_over(store.clone() as Arc<dyn DocumentStore>);

    let id = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 3, 10, 9, 0),
            RecurrenceType::Daily,
        ))
        .await
        .unwrap();
    manager
        .update_status(id, BookingStatus::InProgress)
        .await
        .unwrap();

    // The status write works; the successor create does not.
    store.fail_creates("bookings");
    let outcome = manager
        .update_status(id, BookingStatus::Completed)
        .await
        .unwrap();

    assert_eq!(outcome.status, BookingStatus::Completed);
    assert!(outcome.successor_id.is_none());
    assert_eq!(
        outcome.warning,
        Some(LifecycleWarning::CompletedButRecurrenceFailed)
    );

    let bookings = BookingRepository::new(store.clone() as Arc<dyn DocumentStore>);
    let (booking, _) = bookings.require(id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);
}

#[tokio::test]
async fn client_listing_triage_orders_active_before_history() {
    let (manager, store) = setup();
    let user = Uuid::new_v4();
    let provider = seed_user(store.as_ref(), "Hamid").await;
    let service = seed_service(store.as_ref(), "House Cleaning").await;

    let completed = manager
        .create_booking(booking_input(user, provider, service, at(2025, 5, 1, 10, 0), RecurrenceType::None))
        .await
        .unwrap();
    let confirmed = manager
        .create_booking(booking_input(user, provider, service, at(2025, 6, 5, 10, 0), RecurrenceType::None))
        .await
        .unwrap();
    let in_progress = manager
        .create_booking(booking_input(user, provider, service, at(2025, 6, 1, 10, 0), RecurrenceType::None))
        .await
        .unwrap();
    let cancelled = manager
        .create_booking(booking_input(user, provider, service, at(2025, 1, 1, 10, 0), RecurrenceType::None))
        .await
        .unwrap();

    drive_to(&manager, completed, BookingStatus::Completed).await;
    drive_to(&manager, in_progress, BookingStatus::InProgress).await;
    drive_to(&manager, cancelled, BookingStatus::Cancelled).await;

    let views = manager.list_for_client(user).await.unwrap();
    let ids: Vec<Uuid> = views.iter().map(|v| v.id).collect();

    // Active jobs soonest-first, then history; cancelled never surfaces.
    assert_eq!(ids, vec![in_progress, confirmed, completed]);

    // Enrichment resolved the display names.
    assert!(views.iter().all(|v| v.provider_name == "Hamid"));
    assert!(views.iter().all(|v| v.service_name == "House Cleaning"));
}

#[tokio::test]
async fn enrichment_degrades_to_placeholders() {
    let (manager, _) = setup();
    let user = Uuid::new_v4();

    // Neither the provider nor the service exists in the store.
    let id = manager
        .create_booking(booking_input(
            user,
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();

    let views = manager.list_for_client(user).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, id);
    assert_eq!(views[0].provider_name, "Unknown");
    assert_eq!(views[0].service_name, "Unknown Service");
}

#[tokio::test]
async fn provider_listing_shows_active_jobs_most_recent_first() {
    let (manager, _) = setup();
    let provider = Uuid::new_v4();

    let early = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            provider,
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();
    let late = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            provider,
            Uuid::new_v4(),
            at(2025, 6, 8, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();
    let done = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            provider,
            Uuid::new_v4(),
            at(2025, 6, 15, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();
    drive_to(&manager, done, BookingStatus::Completed).await;

    let views = manager.list_for_provider(provider).await.unwrap();
    let ids: Vec<Uuid> = views.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![late, early], "completed jobs drop out of the provider view");
}

#[tokio::test]
async fn rating_requires_a_completed_booking_and_happens_once() {
    let (manager, store) = setup();
    let user = Uuid::new_v4();
    let provider = Uuid::new_v4();

    let id = manager
        .create_booking(booking_input(
            user,
            provider,
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();

    // Not completed yet.
    let err = manager
        .submit_rating(
            id,
            SubmitRatingInput {
                rating: 5.0,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    drive_to(&manager, id, BookingStatus::Completed).await;

    // Out-of-range ratings are rejected before any write.
    let err = manager
        .submit_rating(
            id,
            SubmitRatingInput {
                rating: 6.0,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    manager
        .submit_rating(
            id,
            SubmitRatingInput {
                rating: 4.5,
                comment: Some("Spotless".to_string()),
            },
        )
        .await
        .unwrap();

    let bookings = BookingRepository::new(store.clone());
    let (booking, _) = bookings.require(id).await.unwrap();
    assert!(booking.rating_submitted);

    let reviews = store.query("reviews", &[]).await.unwrap();
    assert_eq!(reviews.len(), 1);

    // Rating twice is a conflict.
    let err = manager
        .submit_rating(
            id,
            SubmitRatingInput {
                rating: 4.0,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn skipping_a_rating_marks_the_booking() {
    let (manager, store) = setup();
    let id = manager
        .create_booking(booking_input(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            at(2025, 6, 1, 9, 0),
            RecurrenceType::None,
        ))
        .await
        .unwrap();
    drive_to(&manager, id, BookingStatus::Completed).await;

    manager.skip_rating(id).await.unwrap();

    let bookings = BookingRepository::new(store);
    let (booking, _) = bookings.require(id).await.unwrap();
    assert!(booking.rating_skipped);
    assert!(!booking.rating_submitted);
}
