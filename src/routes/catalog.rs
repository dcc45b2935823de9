//! Service catalog and provider directory routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::catalog::ProviderSummary;
use crate::error::ApiError;

/// GET /services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let services = state.catalog.list_services().await?;
    Ok(Json(DataResponse::new(services)))
}

/// GET /services/:service_id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state
        .catalog
        .get_service(service_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("service {} does not exist", service_id)))?;
    Ok(Json(DataResponse::new(service)))
}

/// GET /services/:service_id/providers
///
/// Providers able to perform the service, with aggregated review ratings.
pub async fn list_providers_for_service(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profiles = state.catalog.providers_for_service(service_id).await?;

    let mut providers = Vec::with_capacity(profiles.len());
    for profile in profiles {
        // A failed review fetch leaves the provider listed, just unrated.
        let reviews = state
            .catalog
            .reviews_for_provider(profile.id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(provider_id = %profile.id, error = %e, "Review lookup failed");
                Vec::new()
            });
        providers.push(ProviderSummary::from_profile(profile, &reviews));
    }

    Ok(Json(DataResponse::new(providers)))
}

/// GET /providers/:provider_id/reviews
pub async fn list_provider_reviews(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut reviews = state.catalog.reviews_for_provider(provider_id).await?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(DataResponse::new(reviews)))
}
