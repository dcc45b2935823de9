//! Document store collaborator boundary
//!
//! The engine persists JSON documents keyed by collection/id through this
//! narrow interface. Writes to contended documents go through
//! `update_checked`, which refuses to apply a patch unless the caller still
//! holds the document's current version — the optimistic-concurrency token
//! the lifecycle engines retry on.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A JSON document body
pub type JsonMap = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: Uuid },

    #[error("concurrent modification of {collection}/{id}")]
    Conflict { collection: String, id: Uuid },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Query predicate for `DocumentStore::query`
#[derive(Debug, Clone)]
pub enum Filter {
    /// `field == value`
    Eq(&'static str, Value),
    /// `value` is an element of the array at `field`
    Contains(&'static str, Value),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn contains(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Contains(field, value.into())
    }
}

/// A stored document plus its optimistic-concurrency token
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub version: i64,
    pub body: JsonMap,
}

/// Persistent, queryable document database keyed by collection/id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document; the store assigns and returns its id (and
    /// writes it into the body under `"id"`).
    async fn create(&self, collection: &str, body: JsonMap) -> Result<Uuid, StoreError>;

    /// Point read.
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Filtered scan over one collection.
    async fn query(&self, collection: &str, filters: &[Filter])
        -> Result<Vec<Document>, StoreError>;

    /// Merge `patch` into the document body. Fails with `NotFound` when the
    /// document is absent.
    async fn update(&self, collection: &str, id: Uuid, patch: JsonMap) -> Result<(), StoreError>;

    /// Merge `patch` only if the document still carries `expected_version`;
    /// fails with `Conflict` when another writer got there first.
    async fn update_checked(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        patch: JsonMap,
    ) -> Result<(), StoreError>;
}

/// Strips null fields and non-finite numbers before a write, so no reader
/// can ever observe a document in an undefined shape.
pub fn sanitize(body: &mut JsonMap) {
    body.retain(|_, value| match value {
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(true, f64::is_finite),
        _ => true,
    });
}

/// Does `body` match every filter? Shared by the in-memory store and tests.
pub(crate) fn matches(body: &JsonMap, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(field, value) => body.get(*field) == Some(value),
        Filter::Contains(field, value) => body
            .get(*field)
            .and_then(Value::as_array)
            .is_some_and(|items| items.contains(value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_drops_nulls() {
        let mut body = JsonMap::new();
        body.insert("keep".into(), json!("x"));
        body.insert("drop".into(), Value::Null);
        sanitize(&mut body);
        assert!(body.contains_key("keep"));
        assert!(!body.contains_key("drop"));
    }

    #[test]
    fn eq_filter_matches_scalar() {
        let mut body = JsonMap::new();
        body.insert("status".into(), json!("open"));
        assert!(matches(&body, &[Filter::eq("status", "open")]));
        assert!(!matches(&body, &[Filter::eq("status", "booked")]));
    }

    #[test]
    fn contains_filter_matches_array_membership() {
        let mut body = JsonMap::new();
        body.insert("skills".into(), json!(["a", "b"]));
        assert!(matches(&body, &[Filter::contains("skills", "a")]));
        assert!(!matches(&body, &[Filter::contains("skills", "c")]));
        // non-array field never matches
        body.insert("name".into(), json!("a"));
        assert!(!matches(&body, &[Filter::contains("name", "a")]));
    }
}
