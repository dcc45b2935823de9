//! Booking repository

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::domain::bookings::{Booking, BookingStatus};
use crate::store::{DocumentStore, Filter, JsonMap, StoreError};

use super::{from_doc, new_body};

pub const BOOKINGS_COLLECTION: &str = "bookings";

#[derive(Clone)]
pub struct BookingRepository {
    store: Arc<dyn DocumentStore>,
}

impl BookingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, booking: &Booking) -> Result<Uuid, StoreError> {
        let body = new_body(booking)?;
        self.store.create(BOOKINGS_COLLECTION, body).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<(Booking, i64)>, StoreError> {
        let Some(doc) = self.store.get(BOOKINGS_COLLECTION, id).await? else {
            return Ok(None);
        };
        let version = doc.version;
        Ok(Some((from_doc(doc)?, version)))
    }

    pub async fn require(&self, id: Uuid) -> Result<(Booking, i64), StoreError> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: BOOKINGS_COLLECTION.to_string(),
            id,
        })
    }

    /// All of a client's bookings in the given statuses. The store only
    /// filters by owner; the status set is applied here.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let docs = self
            .store
            .query(BOOKINGS_COLLECTION, &[Filter::eq("user_id", json!(user_id))])
            .await?;
        let bookings: Result<Vec<Booking>, _> = docs.into_iter().map(from_doc).collect();
        Ok(retain_statuses(bookings?, statuses))
    }

    pub async fn list_for_provider(
        &self,
        provider_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let docs = self
            .store
            .query(
                BOOKINGS_COLLECTION,
                &[Filter::eq("provider_id", json!(provider_id))],
            )
            .await?;
        let bookings: Result<Vec<Booking>, _> = docs.into_iter().map(from_doc).collect();
        Ok(retain_statuses(bookings?, statuses))
    }

    /// The booking minted by accepting a bid on the given request, if any.
    pub async fn find_by_source_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        let docs = self
            .store
            .query(
                BOOKINGS_COLLECTION,
                &[Filter::eq("source_request_id", json!(request_id))],
            )
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    /// Version-guarded status write; the contended field of this entity.
    pub async fn set_status_checked(
        &self,
        id: Uuid,
        version: i64,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut patch = JsonMap::new();
        patch.insert("status".to_string(), json!(status));
        self.store
            .update_checked(BOOKINGS_COLLECTION, id, version, patch)
            .await
    }

    pub async fn mark_rating_submitted(&self, id: Uuid) -> Result<(), StoreError> {
        let mut patch = JsonMap::new();
        patch.insert("rating_submitted".to_string(), json!(true));
        self.store.update(BOOKINGS_COLLECTION, id, patch).await
    }

    pub async fn mark_rating_skipped(&self, id: Uuid) -> Result<(), StoreError> {
        let mut patch = JsonMap::new();
        patch.insert("rating_skipped".to_string(), json!(true));
        self.store.update(BOOKINGS_COLLECTION, id, patch).await
    }
}

fn retain_statuses(mut bookings: Vec<Booking>, statuses: &[BookingStatus]) -> Vec<Booking> {
    bookings.retain(|b| statuses.contains(&b.status));
    bookings
}
