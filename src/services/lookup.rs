//! Display-name enrichment lookups
//!
//! Booking lists join against the profile and service-catalog collections
//! for display names. Distinct ids are fetched once per list call; lookup
//! failures degrade to placeholder names and never abort the parent query.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use uuid::Uuid;

use crate::repo::catalog::{SERVICES_COLLECTION, USERS_COLLECTION};
use crate::services::cache::{keys, RedisCache};
use crate::store::DocumentStore;

pub const UNKNOWN_PROVIDER: &str = "Unknown";
pub const UNKNOWN_SERVICE: &str = "Unknown Service";

/// Resolves user ids to display names. Missing ids are simply absent from
/// the result; callers substitute a placeholder.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn display_names(&self, ids: &[Uuid]) -> HashMap<Uuid, String>;
}

/// Resolves service ids to catalog names, same degrade-on-failure contract.
#[async_trait]
pub trait ServiceCatalogLookup: Send + Sync {
    async fn service_names(&self, ids: &[Uuid]) -> HashMap<Uuid, String>;
}

/// Store-backed lookup with an optional Redis layer in front.
pub struct StoreLookup {
    store: Arc<dyn DocumentStore>,
    cache: Option<RedisCache>,
}

impl StoreLookup {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Option<RedisCache>) -> Self {
        Self { store, cache }
    }

    /// Fetch one document's `name` field, consulting the cache first.
    /// Any store error degrades to `None`.
    async fn fetch_name(&self, collection: &str, cache_key: String, id: Uuid) -> Option<String> {
        if let Some(cache) = &self.cache {
            if let Some(name) = cache.get::<String>(&cache_key).await {
                return Some(name);
            }
        }

        let name = match self.store.get(collection, id).await {
            Ok(Some(doc)) => doc
                .body
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    collection = collection,
                    id = %id,
                    error = %e,
                    "Name lookup failed, degrading to placeholder"
                );
                None
            }
        };

        if let (Some(cache), Some(name)) = (&self.cache, &name) {
            if let Err(e) = cache.set(&cache_key, name).await {
                tracing::debug!(error = %e, "Failed to cache display name");
            }
        }
        name
    }

    async fn batch(&self, collection: &'static str, ids: &[Uuid]) -> HashMap<Uuid, String> {
        let fetches = ids.iter().map(|id| {
            let cache_key = match collection {
                USERS_COLLECTION => keys::profile_name(*id),
                _ => keys::service_name(*id),
            };
            async move {
                let name = self.fetch_name(collection, cache_key, *id).await;
                (*id, name)
            }
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, name)| name.map(|n| (id, n)))
            .collect()
    }
}

#[async_trait]
impl ProfileLookup for StoreLookup {
    async fn display_names(&self, ids: &[Uuid]) -> HashMap<Uuid, String> {
        self.batch(USERS_COLLECTION, ids).await
    }
}

#[async_trait]
impl ServiceCatalogLookup for StoreLookup {
    async fn service_names(&self, ids: &[Uuid]) -> HashMap<Uuid, String> {
        self.batch(SERVICES_COLLECTION, ids).await
    }
}
