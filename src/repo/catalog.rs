//! Service catalog, provider directory, and review access

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::domain::catalog::{ServiceInfo, UserProfile};
use crate::domain::reviews::Review;
use crate::store::{DocumentStore, Filter, StoreError};

use super::{from_doc, new_body};

pub const SERVICES_COLLECTION: &str = "services";
pub const USERS_COLLECTION: &str = "users";
pub const REVIEWS_COLLECTION: &str = "reviews";

#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn DocumentStore>,
}

impl CatalogRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>, StoreError> {
        let docs = self.store.query(SERVICES_COLLECTION, &[]).await?;
        docs.into_iter().map(from_doc).collect()
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Option<ServiceInfo>, StoreError> {
        let Some(doc) = self.store.get(SERVICES_COLLECTION, id).await? else {
            return Ok(None);
        };
        Ok(Some(from_doc(doc)?))
    }

    /// Providers whose skill set covers the given service.
    pub async fn providers_for_service(
        &self,
        service_id: Uuid,
    ) -> Result<Vec<UserProfile>, StoreError> {
        let docs = self
            .store
            .query(
                USERS_COLLECTION,
                &[
                    Filter::eq("role", "provider"),
                    Filter::contains("skills", json!(service_id)),
                ],
            )
            .await?;
        docs.into_iter().map(from_doc).collect()
    }

    pub async fn reviews_for_provider(&self, provider_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let docs = self
            .store
            .query(
                REVIEWS_COLLECTION,
                &[Filter::eq("provider_id", json!(provider_id))],
            )
            .await?;
        docs.into_iter().map(from_doc).collect()
    }

    pub async fn create_review(&self, review: &Review) -> Result<Uuid, StoreError> {
        let body = new_body(review)?;
        self.store.create(REVIEWS_COLLECTION, body).await
    }
}
