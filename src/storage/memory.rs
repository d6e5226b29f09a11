use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{DeleteOutcome, FileUpload, ObjectStore, StorageError, StoredFile};

/// In-process object store. Used by tests and local runs without a storage
/// service; supports failure injection per filename.
#[derive(Default)]
pub struct MemoryObjectStore {
    files: Mutex<HashMap<(String, String), FileUpload>>,
    deletes: Mutex<Vec<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads whose filename equals `filename` fail from now on.
    pub fn fail_uploads_named(&self, filename: impl Into<String>) {
        self.lock_failing().insert(filename.into());
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Seed a file directly, bypassing failure injection.
    pub fn insert(&self, bucket_id: &str, file_id: &str, upload: FileUpload) {
        self.lock_files()
            .insert((bucket_id.to_string(), file_id.to_string()), upload);
    }

    /// Drop a file out of band, as if removed by another client.
    pub fn remove(&self, bucket_id: &str, file_id: &str) {
        self.lock_files()
            .remove(&(bucket_id.to_string(), file_id.to_string()));
    }

    pub fn contains(&self, bucket_id: &str, file_id: &str) -> bool {
        self.lock_files()
            .contains_key(&(bucket_id.to_string(), file_id.to_string()))
    }

    pub fn file_ids(&self, bucket_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock_files()
            .keys()
            .filter(|(bucket, _)| bucket == bucket_id)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn file_count(&self) -> usize {
        self.lock_files().len()
    }

    /// Every file id passed to `delete_file`, in call order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.deletes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), FileUpload>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failing_uploads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<StoredFile, StorageError> {
        if self.lock_failing().contains(&upload.filename) {
            return Err(StorageError::Rejected {
                status: 503,
                body: format!("upload of {} refused", upload.filename),
            });
        }

        let key = (bucket_id.to_string(), file_id.to_string());
        let mut files = self.lock_files();
        if files.contains_key(&key) {
            return Err(StorageError::Rejected {
                status: 409,
                body: format!("file {} already exists", file_id),
            });
        }
        files.insert(key, upload.clone());

        Ok(StoredFile {
            id: file_id.to_string(),
            bucket_id: bucket_id.to_string(),
            name: upload.filename.clone(),
            size: upload.bytes.len() as u64,
            mime_type: upload.content_type.clone().unwrap_or_default(),
        })
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<DeleteOutcome, StorageError> {
        self.deletes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(file_id.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("delete refused".to_string()));
        }

        let removed = self
            .lock_files()
            .remove(&(bucket_id.to_string(), file_id.to_string()));

        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::Missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_of_unknown_file_is_missing_not_error() {
        let store = MemoryObjectStore::new();
        let outcome = store.delete_file("b", "nope").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Missing);
        assert_eq!(store.delete_calls(), vec!["nope".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryObjectStore::new();
        let upload = FileUpload::new(vec![1, 2, 3], "a.png");
        store.create_file("b", "x", &upload).await.unwrap();
        assert!(store.create_file("b", "x", &upload).await.is_err());
        assert_eq!(store.file_count(), 1);
    }
}
