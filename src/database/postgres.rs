use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::store::{without_system_fields, Collection, Document, EntityStore, FieldFilter, StoreError};

/// Document store on a single PostgreSQL JSONB table.
#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Unavailable(format!(
            "stored document is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn create(&self, collection: Collection, fields: Document) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = timestamp();

        let mut document = without_system_fields(fields);
        document.insert("_id".to_string(), Value::String(id.clone()));
        document.insert("createdAt".to_string(), now.clone());
        document.insert("updatedAt".to_string(), now);

        let stored: Value = sqlx::query_scalar(
            "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) RETURNING data",
        )
        .bind(collection.as_str())
        .bind(&id)
        .bind(Value::Object(document))
        .fetch_one(&self.pool)
        .await?;

        into_document(stored)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let stored: Option<Value> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        stored.map(into_document).transpose()
    }

    async fn list(&self, collection: Collection, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<Value> = sqlx::query_scalar(
            "SELECT data FROM documents WHERE collection = $1 AND data @> $2 ORDER BY created_at, id",
        )
        .bind(collection.as_str())
        .bind(filter.to_value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_document).collect()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut patch = without_system_fields(patch);
        patch.insert("updatedAt".to_string(), timestamp());

        // `||` merges top-level keys, leaving keys absent from the patch untouched
        let stored: Option<Value> = sqlx::query_scalar(
            "UPDATE documents SET data = data || $3, updated_at = now() \
             WHERE collection = $1 AND id = $2 RETURNING data",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(patch))
        .fetch_optional(&self.pool)
        .await?;

        stored.map(into_document).transpose()
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let stored: Option<Value> = sqlx::query_scalar(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING data",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        stored.map(into_document).transpose()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
