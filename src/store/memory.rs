//! In-memory document store
//!
//! Backs the test suites and local development. Mutations go through the
//! same versioned-update path as the Postgres store, so concurrency tests
//! exercise real conflict behavior rather than a mocked one.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{matches, Document, DocumentStore, Filter, JsonMap, StoreError};

struct StoredDoc {
    version: i64,
    body: JsonMap,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<Uuid, StoredDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, mut body: JsonMap) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        body.insert("id".to_string(), Value::String(id.to_string()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, StoredDoc { version: 1, body });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.get(&id).map(|doc| Document {
                id,
                version: doc.version,
                body: doc.body.clone(),
            })
        }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| matches(&doc.body, filters))
            .map(|(id, doc)| Document {
                id: *id,
                version: doc.version,
                body: doc.body.clone(),
            })
            .collect())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: JsonMap) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;
        doc.body.extend(patch);
        doc.version += 1;
        Ok(())
    }

    async fn update_checked(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        patch: JsonMap,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;
        if doc.version != expected_version {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id,
            });
        }
        doc.body.extend(patch);
        doc.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(pairs: &[(&str, Value)]) -> JsonMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_id_and_writes_it_into_the_body() {
        let store = MemoryStore::new();
        let id = store
            .create("things", body(&[("name", json!("mop"))]))
            .await
            .unwrap();

        let doc = store.get("things", id).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.body.get("id"), Some(&json!(id.to_string())));
        assert_eq!(doc.body.get("name"), Some(&json!("mop")));
    }

    #[tokio::test]
    async fn update_merges_and_bumps_version() {
        let store = MemoryStore::new();
        let id = store
            .create("things", body(&[("a", json!(1)), ("b", json!(2))]))
            .await
            .unwrap();

        store
            .update("things", id, body(&[("b", json!(3))]))
            .await
            .unwrap();

        let doc = store.get("things", id).await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.body.get("a"), Some(&json!(1)));
        assert_eq!(doc.body.get("b"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn update_checked_rejects_stale_version() {
        let store = MemoryStore::new();
        let id = store
            .create("things", body(&[("n", json!(0))]))
            .await
            .unwrap();

        store
            .update_checked("things", id, 1, body(&[("n", json!(1))]))
            .await
            .unwrap();

        let stale = store
            .update_checked("things", id, 1, body(&[("n", json!(2))]))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict { .. })));

        let doc = store.get("things", id).await.unwrap().unwrap();
        assert_eq!(doc.body.get("n"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let missing = store
            .update("things", Uuid::new_v4(), JsonMap::new())
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn query_applies_filters() {
        let store = MemoryStore::new();
        store
            .create("reqs", body(&[("status", json!("open"))]))
            .await
            .unwrap();
        store
            .create("reqs", body(&[("status", json!("booked"))]))
            .await
            .unwrap();

        let open = store
            .query("reqs", &[Filter::eq("status", "open")])
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        let all = store.query("reqs", &[]).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
