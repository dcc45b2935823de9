//! Service request routes
//!
//! Publishing requests, the provider job board, bidding, and acceptance.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::{DataResponse, MessageResponse};
use crate::app::AppState;
use crate::domain::bids::{AcceptBidInput, PlaceBidInput};
use crate::domain::requests::CreateServiceRequestInput;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// POST /requests
///
/// Publish a new service request open for bidding.
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateServiceRequestInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        client_id = %input.client_id,
        service_name = %input.service_name,
        offered_price = input.offered_price,
        "Creating service request"
    );

    let id = state.negotiation.create_request(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CreatedResponse { id })),
    ))
}

/// GET /requests/open
///
/// The provider job board: every request currently accepting bids.
pub async fn list_open_requests(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut requests = state.negotiation.list_open_requests().await?;
    // Newest postings first.
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = requests.len() as u64;
    let page = pagination.slice(requests);
    Ok(Json(Paginated::new(page, &pagination, total)))
}

/// GET /clients/:client_id/requests
///
/// A client's own requests still open for bidding.
pub async fn list_client_requests(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.negotiation.list_client_requests(client_id).await?;
    Ok(Json(DataResponse::new(requests)))
}

/// POST /requests/:request_id/bids
///
/// Place or replace the calling provider's bid.
pub async fn place_bid(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(input): Json<PlaceBidInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        request_id = %request_id,
        provider_id = %input.provider_id,
        offer_amount = input.offer_amount,
        "Placing bid"
    );

    state.negotiation.place_bid(request_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_code("Bid placed", "BID_PLACED")),
    ))
}

/// POST /requests/:request_id/accept
///
/// Accept one provider's bid, confirming the booking.
pub async fn accept_bid(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
    Json(input): Json<AcceptBidInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        request_id = %request_id,
        provider_id = %input.provider_id,
        "Accepting bid"
    );

    let outcome = state
        .negotiation
        .accept_bid(request_id, input.provider_id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(outcome))))
}

/// POST /requests/:request_id/cancel
///
/// Withdraw an open request.
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.negotiation.cancel_request(request_id).await?;
    Ok(Json(MessageResponse::with_code(
        "Request cancelled",
        "REQUEST_CANCELLED",
    )))
}
