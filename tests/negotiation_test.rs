//! Negotiation engine integration tests: request creation, bidding,
//! acceptance, and cancellation against the in-memory store.

mod helpers;

use std::sync::Arc;

use uuid::Uuid;

use helpers::{bid_input, request_input, FaultyStore};
use servilink_backend::domain::bookings::BookingStatus;
use servilink_backend::domain::requests::RequestStatus;
use servilink_backend::engine::{EngineError, NegotiationEngine, NegotiationWarning};
use servilink_backend::repo::{BookingRepository, RequestRepository};
use servilink_backend::store::{DocumentStore, MemoryStore};

fn engine() -> (NegotiationEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (
        NegotiationEngine::new(store.clone() as Arc<dyn DocumentStore>),
        store,
    )
}

#[tokio::test]
async fn create_request_persists_an_open_request() {
    let (engine, store) = engine();
    let client_id = Uuid::new_v4();

    let id = engine.create_request(request_input(client_id)).await.unwrap();

    let requests = RequestRepository::new(store);
    let (request, version) = requests.require(id).await.unwrap();
    assert_eq!(request.id, id);
    assert_eq!(request.status, RequestStatus::Open);
    assert_eq!(request.client_id, client_id);
    assert!(request.bids.is_empty());
    assert_eq!(version, 1);
}

#[tokio::test]
async fn create_request_validates_before_any_write() {
    let (engine, store) = engine();

    let mut blank_address = request_input(Uuid::new_v4());
    blank_address.address = "  ".to_string();
    let err = engine.create_request(blank_address).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut inverted_window = request_input(Uuid::new_v4());
    inverted_window.end_time = inverted_window.start_time;
    let err = engine.create_request(inverted_window).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut free = request_input(Uuid::new_v4());
    free.offered_price = 0.0;
    let err = engine.create_request(free).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let docs = store.query("service_requests", &[]).await.unwrap();
    assert!(docs.is_empty(), "validation failures must not write");
}

#[tokio::test]
async fn rebidding_replaces_the_providers_previous_offer() {
    let (engine, store) = engine();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();
    let provider = Uuid::new_v4();

    engine
        .place_bid(request_id, bid_input(provider, 70.0))
        .await
        .unwrap();
    engine
        .place_bid(request_id, bid_input(provider, 65.0))
        .await
        .unwrap();

    let requests = RequestRepository::new(store);
    let (request, _) = requests.require(request_id).await.unwrap();
    assert_eq!(request.bids.len(), 1, "one live bid per provider");
    assert_eq!(request.bids[0].provider_id, provider);
    assert_eq!(request.bids[0].offer_amount, 65.0);
}

#[tokio::test]
async fn concurrent_bids_from_different_providers_both_survive() {
    let (engine, store) = engine();
    let engine = Arc::new(engine);
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    let first_provider = Uuid::new_v4();
    let second_provider = Uuid::new_v4();

    let (first, second) = tokio::join!(
        engine.place_bid(request_id, bid_input(first_provider, 70.0)),
        engine.place_bid(request_id, bid_input(second_provider, 75.0)),
    );
    first.unwrap();
    second.unwrap();

    let requests = RequestRepository::new(store);
    let (request, _) = requests.require(request_id).await.unwrap();
    assert_eq!(request.bids.len(), 2, "the later write must not drop the earlier bid");
    let providers: Vec<Uuid> = request.bids.iter().map(|b| b.provider_id).collect();
    assert!(providers.contains(&first_provider));
    assert!(providers.contains(&second_provider));
}

#[tokio::test]
async fn bid_on_missing_request_is_not_found() {
    let (engine, _) = engine();
    let err = engine
        .place_bid(Uuid::new_v4(), bid_input(Uuid::new_v4(), 50.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn bid_requires_a_positive_amount() {
    let (engine, _) = engine();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    let err = engine
        .place_bid(request_id, bid_input(Uuid::new_v4(), -5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn accept_bid_creates_booking_then_flips_request() {
    let (engine, store) = engine();
    let client_id = Uuid::new_v4();
    let provider = Uuid::new_v4();

    let request_id = engine.create_request(request_input(client_id)).await.unwrap();
    engine
        .place_bid(request_id, bid_input(provider, 72.5))
        .await
        .unwrap();

    let outcome = engine.accept_bid(request_id, provider).await.unwrap();
    assert!(outcome.request_booked);
    assert!(outcome.warning.is_none());

    // Exactly one booking, carrying the bid's provider and price.
    let docs = store.query("bookings", &[]).await.unwrap();
    assert_eq!(docs.len(), 1);

    let bookings = BookingRepository::new(store.clone());
    let (booking, _) = bookings.require(outcome.booking_id).await.unwrap();
    assert_eq!(booking.provider_id, provider);
    assert_eq!(booking.user_id, client_id);
    assert_eq!(booking.total_price, 72.5);
    assert_eq!(booking.status, BookingStatus::Confirmed);

    let requests = RequestRepository::new(store);
    let (request, _) = requests.require(request_id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Booked);
    assert_eq!(request.booked_by, Some(provider));
}

#[tokio::test]
async fn accept_bid_requires_an_existing_bid_and_an_open_request() {
    let (engine, _) = engine();
    let provider = Uuid::new_v4();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    // No bid from this provider yet.
    let err = engine.accept_bid(request_id, provider).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    engine
        .place_bid(request_id, bid_input(provider, 60.0))
        .await
        .unwrap();
    engine.accept_bid(request_id, provider).await.unwrap();

    // Second acceptance hits a booked request.
    let err = engine.accept_bid(request_id, provider).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn bids_are_frozen_once_the_request_is_booked() {
    let (engine, _) = engine();
    let provider = Uuid::new_v4();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    engine
        .place_bid(request_id, bid_input(provider, 60.0))
        .await
        .unwrap();
    engine.accept_bid(request_id, provider).await.unwrap();

    let err = engine
        .place_bid(request_id, bid_input(Uuid::new_v4(), 55.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn failed_request_flip_reports_a_warning_not_an_error() {
    let store = FaultyStore::new();
    let engine = NegotiationEngine::new(store.clone() as Arc<dyn DocumentStore>);
    let provider = Uuid::new_v4();

    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();
    engine
        .place_bid(request_id, bid_input(provider, 60.0))
        .await
        .unwrap();

    // The booking write succeeds, the request flip does not.
    store.fail_checked_updates("service_requests");
    let outcome = engine.accept_bid(request_id, provider).await.unwrap();
    assert!(!outcome.request_booked);
    assert_eq!(outcome.warning, Some(NegotiationWarning::RequestStillOpen));

    // The booking exists; the request reads open — the tolerated transient.
    let bookings = BookingRepository::new(store.clone() as Arc<dyn DocumentStore>);
    assert!(bookings.get(outcome.booking_id).await.unwrap().is_some());
    let requests = RequestRepository::new(store.clone() as Arc<dyn DocumentStore>);
    let (request, _) = requests.require(request_id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Open);

    // Recovery: re-run the acceptance once the store heals. It reuses the
    // existing booking instead of minting a second one.
    store.heal();
    let retried = engine.accept_bid(request_id, provider).await.unwrap();
    assert!(retried.request_booked);
    assert_eq!(retried.booking_id, outcome.booking_id);

    let docs = store.query("bookings", &[]).await.unwrap();
    assert_eq!(docs.len(), 1, "reconciliation must not duplicate the booking");

    let (request, _) = requests.require(request_id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Booked);
}

#[tokio::test]
async fn cancel_request_is_terminal_and_idempotent() {
    let (engine, _) = engine();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    engine.cancel_request(request_id).await.unwrap();
    // Cancelling again is a no-op.
    engine.cancel_request(request_id).await.unwrap();

    // A cancelled request accepts no bids.
    let err = engine
        .place_bid(request_id, bid_input(Uuid::new_v4(), 40.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn booked_request_cannot_be_cancelled() {
    let (engine, _) = engine();
    let provider = Uuid::new_v4();
    let request_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();
    engine
        .place_bid(request_id, bid_input(provider, 60.0))
        .await
        .unwrap();
    engine.accept_bid(request_id, provider).await.unwrap();

    let err = engine.cancel_request(request_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn client_listing_shows_only_open_requests() {
    let (engine, _) = engine();
    let client_id = Uuid::new_v4();
    let provider = Uuid::new_v4();

    let open_id = engine.create_request(request_input(client_id)).await.unwrap();
    let booked_id = engine.create_request(request_input(client_id)).await.unwrap();
    let foreign_id = engine
        .create_request(request_input(Uuid::new_v4()))
        .await
        .unwrap();

    engine
        .place_bid(booked_id, bid_input(provider, 50.0))
        .await
        .unwrap();
    engine.accept_bid(booked_id, provider).await.unwrap();

    let mine = engine.list_client_requests(client_id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, open_id);

    let board = engine.list_open_requests().await.unwrap();
    let ids: Vec<Uuid> = board.iter().map(|r| r.id).collect();
    assert!(ids.contains(&open_id));
    assert!(ids.contains(&foreign_id));
    assert!(!ids.contains(&booked_id));
}
