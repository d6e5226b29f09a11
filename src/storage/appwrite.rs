use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{DeleteOutcome, FileUpload, ObjectStore, StorageError, StoredFile};
use crate::config::StorageConfig;

/// Appwrite storage REST client.
pub struct AppwriteStorage {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
    api_key: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl AppwriteStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    fn files_url(&self, bucket_id: &str) -> String {
        format!("{}/storage/buckets/{}/files", self.api_url, bucket_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    fn upload_form(file_id: &str, upload: &FileUpload) -> Result<multipart::Form, StorageError> {
        let content_type = upload.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&upload.filename)
                .first_or_octet_stream()
                .to_string()
        });

        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(&content_type)?;

        Ok(multipart::Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part))
    }

    /// Send a request, retrying transport errors, 429 and 5xx responses with
    /// exponential backoff. Any other response is returned to the caller.
    async fn send_with_retry<F>(&self, op: &str, build: F) -> Result<reqwest::Response, StorageError>
    where
        F: Fn() -> Result<reqwest::RequestBuilder, StorageError>,
    {
        let attempts = self.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            debug!("Appwrite {} (attempt {}/{})", op, attempt, attempts);
            let retryable = match build()?.send().await {
                Ok(response) if is_transient(response.status()) && attempt < attempts => {
                    format!("status {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < attempts => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            let delay = backoff_delay(self.retry_base_delay, attempt);
            warn!(
                "Appwrite {} failed (attempt {}/{}): {}. Retrying in {:?}",
                op, attempt, attempts, retryable, delay
            );
            sleep(delay).await;
        }

        Err(StorageError::Unavailable(format!("{} retries exhausted", op)))
    }
}

/// Longest pause between two attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// `base * 2^(attempt - 1)`, saturating and capped at `MAX_RETRY_DELAY`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn rejection(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StorageError::Rejected { status, body }
}

#[async_trait]
impl ObjectStore for AppwriteStorage {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<StoredFile, StorageError> {
        let url = self.files_url(bucket_id);

        let response = self
            .send_with_retry("create_file", || {
                let form = Self::upload_form(file_id, upload)?;
                Ok(self.authorize(self.client.post(&url)).multipart(form))
            })
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let stored: StoredFile = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        debug!("Stored file {} ({} bytes) in bucket {}", stored.id, upload.bytes.len(), bucket_id);
        Ok(stored)
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<DeleteOutcome, StorageError> {
        let url = format!("{}/{}", self.files_url(bucket_id), file_id);

        let response = self
            .send_with_retry("delete_file", || Ok(self.authorize(self.client.delete(&url))))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::Missing),
            _ => Err(rejection(response).await),
        }
    }
}
