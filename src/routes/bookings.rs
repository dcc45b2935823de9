//! Booking routes
//!
//! Direct scheduling, status transitions, list views, and rating.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{DataResponse, MessageResponse};
use crate::app::AppState;
use crate::domain::bookings::{CreateBookingInput, UpdateStatusInput};
use crate::domain::reviews::SubmitRatingInput;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// POST /bookings
///
/// Direct scheduling with a known provider, no bidding round.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateBookingInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %input.user_id,
        provider_id = %input.provider_id,
        schedule_time = %input.schedule_time,
        "Creating booking"
    );

    let id = state.lifecycle.create_booking(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CreatedResponse { id })),
    ))
}

/// PATCH /bookings/:booking_id/status
///
/// Drive the booking state machine. Completing a recurring booking also
/// schedules its successor; if that secondary step fails the response still
/// succeeds and carries a warning.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        booking_id = %booking_id,
        status = %input.status,
        "Updating booking status"
    );

    let outcome = state.lifecycle.update_status(booking_id, input.status).await?;
    Ok(Json(DataResponse::new(outcome)))
}

/// GET /clients/:user_id/bookings
///
/// The client's booking list: active jobs soonest-first, then history.
pub async fn list_client_bookings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state.lifecycle.list_for_client(user_id).await?;
    Ok(Json(DataResponse::new(bookings)))
}

/// GET /providers/:provider_id/bookings
///
/// The provider's active jobs.
pub async fn list_provider_bookings(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state.lifecycle.list_for_provider(provider_id).await?;
    Ok(Json(DataResponse::new(bookings)))
}

/// POST /bookings/:booking_id/rating
///
/// Rate a completed booking.
pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(input): Json<SubmitRatingInput>,
) -> Result<impl IntoResponse, ApiError> {
    let review_id = state.lifecycle.submit_rating(booking_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CreatedResponse { id: review_id })),
    ))
}

/// POST /bookings/:booking_id/rating/skip
///
/// Dismiss the rating prompt for a completed booking.
pub async fn skip_rating(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.skip_rating(booking_id).await?;
    Ok(Json(MessageResponse::with_code(
        "Rating skipped",
        "RATING_SKIPPED",
    )))
}
