use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{without_system_fields, Collection, Document, EntityStore, FieldFilter, StoreError};

/// In-process document store with the same merge semantics as the
/// PostgreSQL backend. Writes can be made to fail for compensation tests.
#[derive(Default)]
pub struct MemoryEntityStore {
    documents: RwLock<HashMap<(Collection, String), (u64, Document)>>,
    sequence: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, `create` and `update` return `StoreError::Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn create(&self, collection: Collection, fields: Document) -> Result<Document, StoreError> {
        self.check_writable()?;

        let id = Uuid::new_v4().to_string();
        let now = timestamp();
        let mut document = without_system_fields(fields);
        document.insert("_id".to_string(), Value::String(id.clone()));
        document.insert("createdAt".to_string(), now.clone());
        document.insert("updatedAt".to_string(), now);

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.documents
            .write()
            .await
            .insert((collection, id), (seq, document.clone()));
        Ok(document)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&(collection, id.to_string()))
            .map(|(_, doc)| doc.clone()))
    }

    async fn list(&self, collection: Collection, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().await;
        let mut matching: Vec<&(u64, Document)> = documents
            .iter()
            .filter(|((c, _), (_, doc))| *c == collection && filter.matches(doc))
            .map(|(_, entry)| entry)
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.check_writable()?;

        let mut documents = self.documents.write().await;
        let Some((_, document)) = documents.get_mut(&(collection, id.to_string())) else {
            return Ok(None);
        };

        for (key, value) in without_system_fields(patch) {
            document.insert(key, value);
        }
        document.insert("updatedAt".to_string(), timestamp());
        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .documents
            .write()
            .await
            .remove(&(collection, id.to_string()))
            .map(|(_, doc)| doc))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn update_is_a_shallow_merge() {
        let store = MemoryEntityStore::new();
        let created = store
            .create(Collection::Posters, doc(json!({"posterName": "Summer", "imageUrl": "u1"})))
            .await
            .unwrap();
        let id = created["_id"].as_str().unwrap();

        let updated = store
            .update(Collection::Posters, id, doc(json!({"posterName": "Winter"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["posterName"], "Winter");
        assert_eq!(updated["imageUrl"], "u1");
        assert_eq!(updated["_id"], created["_id"]);
    }

    #[tokio::test]
    async fn list_filters_and_keeps_insertion_order() {
        let store = MemoryEntityStore::new();
        for (name, cat) in [("a", "c1"), ("b", "c2"), ("c", "c1")] {
            store
                .create(Collection::Products, doc(json!({"name": name, "proCategoryId": cat})))
                .await
                .unwrap();
        }

        let filter = FieldFilter::all().eq("proCategoryId", "c1");
        let names: Vec<Value> = store
            .list(Collection::Products, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("c")]);
    }

    #[tokio::test]
    async fn unknown_ids_yield_none() {
        let store = MemoryEntityStore::new();
        assert!(store.get(Collection::Users, "x").await.unwrap().is_none());
        assert!(store.update(Collection::Users, "x", Document::new()).await.unwrap().is_none());
        assert!(store.delete(Collection::Users, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_writes_leave_nothing_behind() {
        let store = MemoryEntityStore::new();
        store.fail_writes(true);
        assert!(store.create(Collection::Categories, Document::new()).await.is_err());
        assert_eq!(store.count(Collection::Categories).await, 0);
    }
}
