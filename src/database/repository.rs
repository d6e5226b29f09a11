use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::store::{Collection, Document, EntityStore, FieldFilter, StoreError};

/// A typed document kind living in one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
}

/// Typed access to one collection of an `EntityStore`.
pub struct Repository<T> {
    store: Arc<dyn EntityStore>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn create<N: Serialize>(&self, fields: &N) -> Result<T, StoreError> {
        let document = self.store.create(T::COLLECTION, to_document(fields)?).await?;
        from_document(document)
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn list(&self, filter: FieldFilter) -> Result<Vec<T>, StoreError> {
        self.store
            .list(T::COLLECTION, &filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_one(&self, filter: FieldFilter) -> Result<Option<T>, StoreError> {
        Ok(self.list(filter).await?.into_iter().next())
    }

    pub async fn exists(&self, filter: FieldFilter) -> Result<bool, StoreError> {
        Ok(!self.store.list(T::COLLECTION, &filter).await?.is_empty())
    }

    /// Shallow-merge `patch` into the stored document. Fields the patch
    /// serializes as absent are left untouched.
    pub async fn update<P: Serialize>(&self, id: &str, patch: &P) -> Result<Option<T>, StoreError> {
        self.store
            .update(T::COLLECTION, id, to_document(patch)?)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .delete(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }
}

fn to_document<S: Serialize>(value: &S) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Unavailable(format!(
            "expected an object to store, got {}",
            other
        ))),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
