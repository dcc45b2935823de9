//! Shared fixtures for the integration suites

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use servilink_backend::domain::bids::PlaceBidInput;
use servilink_backend::domain::requests::CreateServiceRequestInput;
use servilink_backend::store::{Document, DocumentStore, Filter, JsonMap, MemoryStore, StoreError};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn request_input(client_id: Uuid) -> CreateServiceRequestInput {
    CreateServiceRequestInput {
        client_id,
        service_id: Uuid::new_v4(),
        service_name: "House Cleaning".to_string(),
        address: "12 Garden Road".to_string(),
        start_time: at(2025, 6, 1, 9, 0),
        end_time: at(2025, 6, 1, 12, 0),
        offered_price: 80.0,
        comments: Some("Two bedrooms".to_string()),
    }
}

pub fn bid_input(provider_id: Uuid, amount: f64) -> PlaceBidInput {
    PlaceBidInput {
        provider_id,
        provider_name: "Hamid".to_string(),
        provider_avatar: None,
        offer_amount: amount,
        comment: Some("Can start right away".to_string()),
    }
}

/// Seed a user profile document so enrichment lookups can resolve it.
pub async fn seed_user(store: &dyn DocumentStore, name: &str) -> Uuid {
    let mut body = JsonMap::new();
    body.insert("name".to_string(), json!(name));
    body.insert("role".to_string(), json!("provider"));
    store.create("users", body).await.unwrap()
}

/// Seed a catalog service document.
pub async fn seed_service(store: &dyn DocumentStore, name: &str) -> Uuid {
    let mut body = JsonMap::new();
    body.insert("name".to_string(), json!(name));
    store.create("services", body).await.unwrap()
}

/// A memory store with injectable write failures, for exercising the
/// partial-failure paths.
pub struct FaultyStore {
    inner: MemoryStore,
    fail_creates_in: Mutex<Option<String>>,
    fail_checked_updates_in: Mutex<Option<String>>,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            fail_creates_in: Mutex::new(None),
            fail_checked_updates_in: Mutex::new(None),
        })
    }

    /// Make every `create` into `collection` fail from now on.
    pub fn fail_creates(&self, collection: &str) {
        *self.fail_creates_in.lock() = Some(collection.to_string());
    }

    /// Make every `update_checked` into `collection` fail from now on.
    pub fn fail_checked_updates(&self, collection: &str) {
        *self.fail_checked_updates_in.lock() = Some(collection.to_string());
    }

    pub fn heal(&self) {
        *self.fail_creates_in.lock() = None;
        *self.fail_checked_updates_in.lock() = None;
    }

    fn injected(&self) -> StoreError {
        StoreError::Unavailable("injected failure".to_string())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn create(&self, collection: &str, body: JsonMap) -> Result<Uuid, StoreError> {
        if self.fail_creates_in.lock().as_deref() == Some(collection) {
            return Err(self.injected());
        }
        self.inner.create(collection, body).await
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, filters).await
    }

    async fn update(&self, collection: &str, id: Uuid, patch: JsonMap) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn update_checked(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        patch: JsonMap,
    ) -> Result<(), StoreError> {
        if self.fail_checked_updates_in.lock().as_deref() == Some(collection) {
            return Err(self.injected());
        }
        self.inner
            .update_checked(collection, id, expected_version, patch)
            .await
    }
}
