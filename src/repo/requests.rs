//! Service request repository

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::domain::requests::{RequestStatus, ServiceRequest};
use crate::store::{DocumentStore, Filter, JsonMap, StoreError};

use super::{from_doc, new_body};

pub const REQUESTS_COLLECTION: &str = "service_requests";

#[derive(Clone)]
pub struct RequestRepository {
    store: Arc<dyn DocumentStore>,
}

impl RequestRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: &ServiceRequest) -> Result<Uuid, StoreError> {
        let body = new_body(request)?;
        self.store.create(REQUESTS_COLLECTION, body).await
    }

    /// Point read returning the entity together with its version token.
    pub async fn get(&self, id: Uuid) -> Result<Option<(ServiceRequest, i64)>, StoreError> {
        let Some(doc) = self.store.get(REQUESTS_COLLECTION, id).await? else {
            return Ok(None);
        };
        let version = doc.version;
        Ok(Some((from_doc(doc)?, version)))
    }

    pub async fn require(&self, id: Uuid) -> Result<(ServiceRequest, i64), StoreError> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: REQUESTS_COLLECTION.to_string(),
            id,
        })
    }

    pub async fn list_open(&self) -> Result<Vec<ServiceRequest>, StoreError> {
        let docs = self
            .store
            .query(REQUESTS_COLLECTION, &[Filter::eq("status", "open")])
            .await?;
        docs.into_iter().map(from_doc).collect()
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<ServiceRequest>, StoreError> {
        let docs = self
            .store
            .query(
                REQUESTS_COLLECTION,
                &[Filter::eq("client_id", json!(client_id))],
            )
            .await?;
        docs.into_iter().map(from_doc).collect()
    }

    /// Version-guarded status flip; `booked_by` rides along when a bid
    /// acceptance caused it.
    pub async fn set_status_checked(
        &self,
        id: Uuid,
        version: i64,
        status: RequestStatus,
        booked_by: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let mut patch = JsonMap::new();
        patch.insert("status".to_string(), json!(status));
        if let Some(provider_id) = booked_by {
            patch.insert("booked_by".to_string(), json!(provider_id));
        }
        self.store
            .update_checked(REQUESTS_COLLECTION, id, version, patch)
            .await
    }
}
