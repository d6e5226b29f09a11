use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: a JSON object carrying `_id`, `createdAt` and `updatedAt`
/// next to its entity fields.
pub type Document = Map<String, Value>;

/// Fields maintained by the store; never accepted from callers.
pub const SYSTEM_FIELDS: &[&str] = &["_id", "createdAt", "updatedAt"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Categories,
    SubCategories,
    Posters,
    Products,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::SubCategories => "subcategories",
            Collection::Posters => "posters",
            Collection::Products => "products",
            Collection::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of top-level field equalities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldFilter {
    fields: Document,
}

impl FieldFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The filter as a JSON object, usable with JSONB containment (`@>`).
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Document persistence over the fixed set of collections.
///
/// `update` is a shallow merge: keys absent from the patch keep their stored
/// value. All single-document operations return `Ok(None)` for unknown ids.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert `fields`, assigning `_id` and timestamps. Returns the stored document.
    async fn create(&self, collection: Collection, fields: Document) -> Result<Document, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents matching `filter`, oldest first.
    async fn list(&self, collection: Collection, filter: &FieldFilter) -> Result<Vec<Document>, StoreError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove a document, returning it as it was.
    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Strip system fields from caller-supplied data.
pub fn without_system_fields(mut document: Document) -> Document {
    for field in SYSTEM_FIELDS {
        document.remove(*field);
    }
    document
}
