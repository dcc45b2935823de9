pub mod bookings;
pub mod catalog;
pub mod health;
pub mod requests;
pub mod tracking;

use axum::{routing::get, routing::patch, routing::post, routing::put, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Service requests and bidding
        .route("/requests", post(requests::create_request))
        .route("/requests/open", get(requests::list_open_requests))
        .route("/requests/:request_id/bids", post(requests::place_bid))
        .route("/requests/:request_id/accept", post(requests::accept_bid))
        .route("/requests/:request_id/cancel", post(requests::cancel_request))
        .route(
            "/clients/:client_id/requests",
            get(requests::list_client_requests),
        )
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:booking_id/status", patch(bookings::update_status))
        .route("/bookings/:booking_id/rating", post(bookings::submit_rating))
        .route(
            "/bookings/:booking_id/rating/skip",
            post(bookings::skip_rating),
        )
        .route(
            "/clients/:user_id/bookings",
            get(bookings::list_client_bookings),
        )
        .route(
            "/providers/:provider_id/bookings",
            get(bookings::list_provider_bookings),
        )
        // Live tracking
        .route(
            "/providers/:provider_id/location",
            put(tracking::publish_location),
        )
        .route("/providers/:provider_id/eta", get(tracking::provider_eta))
        // Catalog and provider directory
        .route("/services", get(catalog::list_services))
        .route("/services/:service_id", get(catalog::get_service))
        .route(
            "/services/:service_id/providers",
            get(catalog::list_providers_for_service),
        )
        .route(
            "/providers/:provider_id/reviews",
            get(catalog::list_provider_reviews),
        )
}
