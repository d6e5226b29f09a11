use chrono::Utc;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Builds and parses the public view URLs stored on entities:
/// `{api}/storage/buckets/{bucket}/files/{fileId}/view?project={project}&mode=admin`
#[derive(Debug, Clone)]
pub struct AssetUrlCodec {
    api_url: String,
    bucket_id: String,
    project_id: String,
}

impl AssetUrlCodec {
    pub fn new(
        api_url: impl Into<String>,
        bucket_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            bucket_id: bucket_id.into(),
            project_id: project_id.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.api_url, &config.bucket_id, &config.project_id)
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    pub fn build_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}&mode=admin",
            self.api_url, self.bucket_id, file_id, self.project_id
        )
    }

    /// Recover the file id from a stored URL. Returns `None` for URLs that
    /// don't contain a `/files/{id}/view` segment; callers skip deletion then.
    pub fn extract_file_id(url: &str) -> Option<String> {
        const MARKER: &str = "/files/";

        let mut search_from = 0;
        while let Some(pos) = url[search_from..].find(MARKER) {
            let start = search_from + pos + MARKER.len();
            let rest = &url[start..];
            if let Some(end) = rest.find('/') {
                let id = &rest[..end];
                if !id.is_empty() && rest[end..].starts_with("/view") {
                    return Some(id.to_string());
                }
            }
            search_from = start;
        }
        None
    }
}

/// Fresh file id: `image_{unix_millis}_{8 hex chars}`. The random suffix keeps
/// ids unique when several slots upload within the same millisecond; the whole
/// id stays under the 36 character limit of the storage service.
pub fn generate_file_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("image_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}
