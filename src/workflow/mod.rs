//! Image lifecycle shared by every entity that owns object-store files.
//!
//! Each mutating request follows one of three protocols:
//!
//! - **create**: upload every supplied slot concurrently, then persist once.
//!   A failed upload cancels the rest and removes whatever already landed; a
//!   failed persist removes all uploaded files.
//! - **replace**: upload the new files, persist the merged slot set, and only
//!   then delete the superseded files. A failed persist removes the new files
//!   and keeps the old ones, so stored URLs never point at deleted files.
//! - **release**: after the document is gone, delete every referenced file,
//!   tolerating missing files and carrying on past individual failures.

mod slots;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::storage::{generate_file_id, AssetUrlCodec, DeleteOutcome, ObjectStore};

pub use slots::{ImageOwner, ImageSet, SlotUpload};

/// A file that now exists in the object store, bound to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub slot: usize,
    pub file_id: String,
    pub url: String,
}

/// Outcome of a best-effort file cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    /// Already gone from the object store.
    pub missing: Vec<String>,
    /// URLs without a recoverable file id.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl CleanupReport {
    /// True when nothing was left behind in the object store.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct ImageWorkflow {
    objects: Arc<dyn ObjectStore>,
    codec: AssetUrlCodec,
}

impl ImageWorkflow {
    pub fn new(objects: Arc<dyn ObjectStore>, codec: AssetUrlCodec) -> Self {
        Self { objects, codec }
    }

    pub fn codec(&self) -> &AssetUrlCodec {
        &self.codec
    }

    /// Reject slots outside `1..=capacity`, duplicates and empty files.
    pub fn check_slots(capacity: usize, uploads: &[SlotUpload]) -> Result<(), ApiError> {
        let mut seen = HashSet::new();
        for upload in uploads {
            if upload.slot == 0 || upload.slot > capacity {
                return Err(ApiError::validation_error(
                    format!("Image slot {} is out of range (1..={})", upload.slot, capacity),
                    None,
                ));
            }
            if !seen.insert(upload.slot) {
                return Err(ApiError::validation_error(
                    format!("Image slot {} supplied more than once", upload.slot),
                    None,
                ));
            }
            if upload.file.is_empty() {
                return Err(ApiError::validation_error(
                    format!("Uploaded file for image slot {} is empty", upload.slot),
                    None,
                ));
            }
        }
        Ok(())
    }

    /// Upload all slots concurrently under fresh file ids. The first failure
    /// cancels the remaining uploads and deletes every id that may have landed.
    pub async fn upload_slots(&self, uploads: Vec<SlotUpload>) -> Result<Vec<UploadedAsset>, ApiError> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }

        let bucket_id = self.codec.bucket_id();
        let planned: Vec<(SlotUpload, String)> = uploads
            .into_iter()
            .map(|upload| (upload, generate_file_id()))
            .collect();

        let mut pending: FuturesUnordered<_> = planned
            .iter()
            .map(|(upload, file_id)| async move {
                let result = self.objects.create_file(bucket_id, file_id, &upload.file).await;
                (upload.slot, result)
            })
            .collect();

        let mut uploaded = Vec::with_capacity(planned.len());
        let mut failure = None;
        while let Some((slot, result)) = pending.next().await {
            match result {
                Ok(stored) => uploaded.push(UploadedAsset {
                    slot,
                    url: self.codec.build_url(&stored.id),
                    file_id: stored.id,
                }),
                Err(err) => {
                    failure = Some((slot, err));
                    break;
                }
            }
        }
        drop(pending);

        if let Some((slot, err)) = failure {
            // Cancelled uploads may or may not exist remotely, and so may the
            // failed one: a retried create can be refused after an earlier
            // attempt was committed. Delete every planned id; Missing is fine.
            let leftovers: Vec<String> = planned.iter().map(|(_, file_id)| file_id.clone()).collect();
            warn!(
                "Upload for image slot {} failed, discarding {} planned upload(s)",
                slot,
                leftovers.len()
            );
            self.discard(&leftovers).await;
            return Err(err.into());
        }

        uploaded.sort_by_key(|asset| asset.slot);
        debug!("Uploaded {} image(s)", uploaded.len());
        Ok(uploaded)
    }

    /// Upload `uploads`, then run `persist` with the resulting assets. If
    /// `persist` fails the uploaded files are deleted before returning its error.
    pub async fn create<T, F, Fut>(
        &self,
        capacity: usize,
        uploads: Vec<SlotUpload>,
        persist: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce(Vec<UploadedAsset>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        Self::check_slots(capacity, &uploads)?;
        let uploaded = self.upload_slots(uploads).await?;

        match persist(uploaded.clone()).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.compensate(&uploaded).await;
                Err(err)
            }
        }
    }

    /// Swap the files of the supplied slots. New files are uploaded first,
    /// `persist` writes the new URLs, and only after it succeeds are the
    /// superseded files deleted. A file is superseded when `current`
    /// referenced it and the persisted document no longer does. Failing to
    /// delete an old file does not fail the request; it is logged as a leftover.
    pub async fn replace<T, F, Fut>(
        &self,
        current: &T,
        uploads: Vec<SlotUpload>,
        persist: F,
    ) -> Result<T, ApiError>
    where
        T: ImageOwner,
        F: FnOnce(Vec<UploadedAsset>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        Self::check_slots(T::SLOTS, &uploads)?;
        let uploaded = self.upload_slots(uploads).await?;

        match persist(uploaded.clone()).await {
            Ok(value) => {
                let still_referenced: HashSet<String> = value.asset_urls().into_iter().collect();
                let mut seen = HashSet::new();
                let mut superseded = current.asset_urls();
                superseded.retain(|url| !still_referenced.contains(url) && seen.insert(url.clone()));

                let report = self.release(superseded).await;
                if !report.is_clean() || !report.skipped.is_empty() {
                    warn!(
                        "Replaced images left old files behind: failed={:?} unrecognised={:?}",
                        report.failed, report.skipped
                    );
                }
                Ok(value)
            }
            Err(err) => {
                self.compensate(&uploaded).await;
                Err(err)
            }
        }
    }

    /// Delete every file referenced by `urls`. Never fails: unknown URL shapes
    /// are skipped, missing files are fine, and other errors are collected.
    pub async fn release(&self, urls: Vec<String>) -> CleanupReport {
        let mut report = CleanupReport::default();
        let mut targets = Vec::new();

        for url in urls {
            match AssetUrlCodec::extract_file_id(&url) {
                Some(file_id) => targets.push(file_id),
                None => report.skipped.push(url),
            }
        }

        let bucket_id = self.codec.bucket_id();
        let outcomes = join_all(
            targets
                .iter()
                .map(|file_id| self.objects.delete_file(bucket_id, file_id)),
        )
        .await;

        for (file_id, outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(DeleteOutcome::Deleted) => report.deleted.push(file_id),
                Ok(DeleteOutcome::Missing) => {
                    debug!("File {} already absent from storage", file_id);
                    report.missing.push(file_id);
                }
                Err(err) => {
                    warn!("Failed to delete file {}: {}", file_id, err);
                    report.failed.push(file_id);
                }
            }
        }

        report
    }

    async fn compensate(&self, uploaded: &[UploadedAsset]) {
        if uploaded.is_empty() {
            return;
        }
        info!("Persisting failed, removing {} uploaded file(s)", uploaded.len());
        let file_ids: Vec<String> = uploaded.iter().map(|asset| asset.file_id.clone()).collect();
        self.discard(&file_ids).await;
    }

    async fn discard(&self, file_ids: &[String]) {
        let bucket_id = self.codec.bucket_id();
        let outcomes = join_all(
            file_ids
                .iter()
                .map(|file_id| self.objects.delete_file(bucket_id, file_id)),
        )
        .await;

        for (file_id, outcome) in file_ids.iter().zip(outcomes) {
            if let Err(err) = outcome {
                warn!("Orphaned file {} could not be removed: {}", file_id, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileUpload, MemoryObjectStore, StorageError, StoredFile};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const BUCKET: &str = "bucket";

    /// Image owner with free-form `(slot, url)` entries; duplicates allowed.
    #[derive(Debug, Clone, Default)]
    struct Doc(Vec<(usize, String)>);

    impl ImageOwner for Doc {
        const SLOTS: usize = 5;

        fn image_set(&self) -> ImageSet {
            let mut set = ImageSet::empty(Self::SLOTS);
            for (slot, url) in &self.0 {
                set.set(*slot, Some(url.clone()));
            }
            set
        }

        fn asset_urls(&self) -> Vec<String> {
            self.0.iter().map(|(_, url)| url.clone()).collect()
        }
    }

    impl Doc {
        fn with(&self, assets: &[UploadedAsset]) -> Doc {
            let mut entries: Vec<(usize, String)> = self
                .0
                .iter()
                .filter(|(slot, _)| assets.iter().all(|asset| asset.slot != *slot))
                .cloned()
                .collect();
            entries.extend(assets.iter().map(|asset| (asset.slot, asset.url.clone())));
            Doc(entries)
        }
    }

    /// Stores the file, then answers with the conflict a retried create sees
    /// when an earlier attempt already landed.
    struct CommittedThenConflict(Arc<MemoryObjectStore>);

    #[async_trait]
    impl ObjectStore for CommittedThenConflict {
        async fn create_file(
            &self,
            bucket_id: &str,
            file_id: &str,
            upload: &FileUpload,
        ) -> Result<StoredFile, StorageError> {
            self.0.create_file(bucket_id, file_id, upload).await?;
            Err(StorageError::Rejected {
                status: 409,
                body: "file already exists".to_string(),
            })
        }

        async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<DeleteOutcome, StorageError> {
            self.0.delete_file(bucket_id, file_id).await
        }
    }

    fn setup() -> (Arc<MemoryObjectStore>, ImageWorkflow) {
        let objects = Arc::new(MemoryObjectStore::new());
        let codec = AssetUrlCodec::new("https://storage.test/v1", BUCKET, "proj");
        (objects.clone(), ImageWorkflow::new(objects, codec))
    }

    fn upload(slot: usize, name: &str) -> SlotUpload {
        SlotUpload::new(slot, FileUpload::new(name.as_bytes().to_vec(), name))
    }

    #[tokio::test]
    async fn create_uploads_every_slot_before_persisting() {
        let (objects, workflow) = setup();
        let uploads = vec![upload(3, "c.png"), upload(1, "a.png"), upload(5, "e.png")];

        let assets = workflow
            .create(5, uploads, |assets| async move { Ok(assets) })
            .await
            .unwrap();

        assert_eq!(assets.iter().map(|a| a.slot).collect::<Vec<_>>(), vec![1, 3, 5]);
        for asset in &assets {
            assert!(objects.contains(BUCKET, &asset.file_id));
            assert_eq!(AssetUrlCodec::extract_file_id(&asset.url).as_deref(), Some(asset.file_id.as_str()));
        }
    }

    #[tokio::test]
    async fn failed_slot_upload_aborts_without_persisting_or_leaving_files() {
        let (objects, workflow) = setup();
        objects.fail_uploads_named("bad.png");
        let persisted = AtomicBool::new(false);
        let flag = &persisted;

        let result = workflow
            .create(
                5,
                vec![upload(1, "a.png"), upload(2, "bad.png"), upload(3, "c.png")],
                |_| async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;

        assert!(result.is_err());
        assert!(!persisted.load(Ordering::SeqCst));
        assert_eq!(objects.file_count(), 0);
    }

    #[tokio::test]
    async fn failed_persist_removes_uploaded_files() {
        let (objects, workflow) = setup();

        let result: Result<(), ApiError> = workflow
            .create(1, vec![upload(1, "a.png")], |_| async {
                Err(ApiError::internal_server_error("db down"))
            })
            .await;

        assert_eq!(result.unwrap_err().status_code(), 500);
        assert_eq!(objects.file_count(), 0);
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_and_duplicate_slots() {
        let (objects, workflow) = setup();

        let out_of_range = workflow
            .create(1, vec![upload(2, "a.png")], |_| async { Ok(()) })
            .await;
        assert_eq!(out_of_range.unwrap_err().status_code(), 400);

        let duplicate = workflow
            .create(5, vec![upload(2, "a.png"), upload(2, "b.png")], |_| async { Ok(()) })
            .await;
        assert_eq!(duplicate.unwrap_err().status_code(), 400);
        assert_eq!(objects.file_count(), 0);
    }

    #[tokio::test]
    async fn upload_refused_after_commit_is_still_discarded() {
        let objects = Arc::new(MemoryObjectStore::new());
        let codec = AssetUrlCodec::new("https://storage.test/v1", BUCKET, "proj");
        let workflow = ImageWorkflow::new(Arc::new(CommittedThenConflict(objects.clone())), codec);

        let result = workflow
            .create(5, vec![upload(1, "a.png"), upload(2, "b.png")], |_| async { Ok(()) })
            .await;

        assert_eq!(result.unwrap_err().status_code(), 500);
        assert_eq!(objects.file_count(), 0);
        assert_eq!(objects.delete_calls().len(), 2);
    }

    #[tokio::test]
    async fn replace_deletes_old_file_only_after_persist() {
        let (objects, workflow) = setup();
        objects.insert(BUCKET, "old_1", FileUpload::new(vec![1], "old.png"));
        let current = Doc(vec![(1, workflow.codec().build_url("old_1"))]);

        let updated = workflow
            .replace(&current, vec![upload(1, "new.png")], |assets| {
                // The old file must still be there while persisting.
                let old_present = objects.contains(BUCKET, "old_1");
                let next = current.with(&assets);
                async move {
                    assert!(old_present);
                    Ok(next)
                }
            })
            .await
            .unwrap();

        assert!(!objects.contains(BUCKET, "old_1"));
        let new_id = AssetUrlCodec::extract_file_id(&updated.0[0].1).unwrap();
        assert!(objects.contains(BUCKET, &new_id));
    }

    #[tokio::test]
    async fn replace_with_failed_persist_keeps_old_and_drops_new() {
        let (objects, workflow) = setup();
        objects.insert(BUCKET, "old_1", FileUpload::new(vec![1], "old.png"));
        let current = Doc(vec![(1, workflow.codec().build_url("old_1"))]);

        let result: Result<Doc, ApiError> = workflow
            .replace(&current, vec![upload(1, "new.png")], |_| async {
                Err(ApiError::not_found("Poster not found."))
            })
            .await;

        assert_eq!(result.unwrap_err().status_code(), 404);
        assert_eq!(objects.file_ids(BUCKET), vec!["old_1".to_string()]);
    }

    #[tokio::test]
    async fn replace_into_empty_slot_deletes_nothing() {
        let (objects, workflow) = setup();
        let current = Doc::default();

        workflow
            .replace(&current, vec![upload(4, "d.png")], |assets| {
                let next = current.with(&assets);
                async move { Ok(next) }
            })
            .await
            .unwrap();

        assert!(objects.delete_calls().is_empty());
        assert_eq!(objects.file_count(), 1);
    }

    #[tokio::test]
    async fn replace_releases_every_duplicate_of_a_replaced_slot() {
        let (objects, workflow) = setup();
        let codec = workflow.codec().clone();
        for id in ["a1", "a2", "c2"] {
            objects.insert(BUCKET, id, FileUpload::new(vec![1], "x.png"));
        }
        let current = Doc(vec![
            (1, codec.build_url("a1")),
            (1, codec.build_url("a2")),
            (2, codec.build_url("c2")),
        ]);

        workflow
            .replace(&current, vec![upload(1, "new.png")], |assets| {
                let next = current.with(&assets);
                async move { Ok(next) }
            })
            .await
            .unwrap();

        assert!(!objects.contains(BUCKET, "a1"));
        assert!(!objects.contains(BUCKET, "a2"));
        assert!(objects.contains(BUCKET, "c2"));
    }

    #[tokio::test]
    async fn replace_never_deletes_a_file_the_persisted_document_references() {
        let (objects, workflow) = setup();
        let codec = workflow.codec().clone();
        for id in ["a1", "a2"] {
            objects.insert(BUCKET, id, FileUpload::new(vec![1], "x.png"));
        }
        let current = Doc(vec![(1, codec.build_url("a1")), (1, codec.build_url("a2"))]);

        // Persisting overwrote only the first slot 1 entry.
        let kept = codec.build_url("a2");
        workflow
            .replace(&current, vec![upload(1, "new.png")], |assets| async move {
                Ok(Doc(vec![(1, assets[0].url.clone()), (1, kept)]))
            })
            .await
            .unwrap();

        assert_eq!(objects.delete_calls(), vec!["a1".to_string()]);
        assert!(objects.contains(BUCKET, "a2"));
    }

    #[tokio::test]
    async fn old_file_delete_failure_does_not_fail_replace() {
        let (objects, workflow) = setup();
        objects.insert(BUCKET, "old_1", FileUpload::new(vec![1], "old.png"));
        objects.fail_deletes(true);
        let current = Doc(vec![(1, workflow.codec().build_url("old_1"))]);

        let result = workflow
            .replace(&current, vec![upload(1, "new.png")], |assets| {
                let next = current.with(&assets);
                async move { Ok(next) }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(objects.file_count(), 2);
    }

    #[tokio::test]
    async fn release_tolerates_missing_unknown_and_failing_files() {
        let (objects, workflow) = setup();
        objects.insert(BUCKET, "present", FileUpload::new(vec![1], "p.png"));
        let codec = workflow.codec().clone();

        let report = workflow
            .release(vec![
                codec.build_url("present"),
                codec.build_url("gone"),
                "https://legacy.example/image/products/x.png".to_string(),
            ])
            .await;

        assert_eq!(report.deleted, vec!["present".to_string()]);
        assert_eq!(report.missing, vec!["gone".to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.is_clean());

        objects.insert(BUCKET, "stuck", FileUpload::new(vec![1], "s.png"));
        objects.fail_deletes(true);
        let report = workflow.release(vec![codec.build_url("stuck")]).await;
        assert_eq!(report.failed, vec!["stuck".to_string()]);
        assert!(!report.is_clean());
    }
}
