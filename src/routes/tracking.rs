//! Live tracking routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::location::{GeoPoint, PublishLocationInput};
use crate::error::ApiError;

/// PUT /providers/:provider_id/location
///
/// Overwrite the provider's live position; last write wins.
pub async fn publish_location(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
    Json(input): Json<PublishLocationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state.tracking.publish_location(
        provider_id,
        GeoPoint {
            latitude: input.latitude,
            longitude: input.longitude,
        },
    )?;
    Ok(Json(DataResponse::new(location)))
}

/// Destination query for an ETA lookup
#[derive(Debug, Deserialize)]
pub struct EtaQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// GET /providers/:provider_id/eta?latitude=..&longitude=..
///
/// Travel estimate from the provider's live position to the destination.
pub async fn provider_eta(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
    Query(destination): Query<EtaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let eta = state
        .tracking
        .eta_for_provider(
            provider_id,
            GeoPoint {
                latitude: destination.latitude,
                longitude: destination.longitude,
            },
        )
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "provider {} has no live location",
                provider_id
            ))
        })?;
    Ok(Json(DataResponse::new(eta)))
}
