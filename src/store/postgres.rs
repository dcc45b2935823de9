//! Postgres-backed document store
//!
//! One JSONB table holds every collection; `version` is the
//! optimistic-concurrency token `update_checked` enforces. Equality filters
//! compile to JSONB containment so the GIN index on `body` serves them.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, JsonMap, StoreError};

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the documents table and its index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT        NOT NULL,
                id          UUID        NOT NULL,
                version     BIGINT      NOT NULL DEFAULT 1,
                body        JSONB       NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING gin (body)",
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        tracing::info!("Document store schema ready");
        Ok(())
    }

    async fn exists(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
        )
        .bind(collection)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn row_to_document(id: Uuid, version: i64, body: Value) -> Result<Document, StoreError> {
    match body {
        Value::Object(map) => Ok(Document {
            id,
            version,
            body: map,
        }),
        other => Err(StoreError::Serialization(format!(
            "document body is not an object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, mut body: JsonMap) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        body.insert("id".to_string(), Value::String(id.to_string()));

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(Value::Object(body))
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            "SELECT version, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|r| row_to_document(id, r.get("version"), r.get("body")))
            .transpose()
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let mut sql =
            String::from("SELECT id, version, body FROM documents WHERE collection = $1");
        let mut binds: Vec<Value> = Vec::with_capacity(filters.len());

        // Field names come from in-crate constants, never from callers, so
        // interpolating them is safe; values always go through binds.
        for filter in filters {
            match filter {
                Filter::Eq(field, value) => {
                    let mut probe = JsonMap::new();
                    probe.insert(field.to_string(), value.clone());
                    binds.push(Value::Object(probe));
                    sql.push_str(&format!(" AND body @> ${}", binds.len() + 1));
                }
                Filter::Contains(field, value) => {
                    binds.push(Value::Array(vec![value.clone()]));
                    sql.push_str(&format!(" AND body->'{}' @> ${}", field, binds.len() + 1));
                }
            }
        }

        let mut query = sqlx::query(&sql).bind(collection);
        for bind in binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(unavailable)?;
        rows.into_iter()
            .map(|r| row_to_document(r.get("id"), r.get("version"), r.get("body")))
            .collect()
    }

    async fn update(&self, collection: &str, id: Uuid, patch: JsonMap) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = body || $3, version = version + 1, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn update_checked(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        patch: JsonMap,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = body || $3, version = version + 1, updated_at = now()
            WHERE collection = $1 AND id = $2 AND version = $4
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing document.
            if self.exists(collection, id).await? {
                return Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id,
                });
            }
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }
}
