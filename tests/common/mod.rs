#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::task::JoinHandle;

use storefront_admin_api::auth::{generate_jwt, Claims};
use storefront_admin_api::config::AppConfig;
use storefront_admin_api::database::MemoryEntityStore;
use storefront_admin_api::storage::{AssetUrlCodec, FileUpload, MemoryObjectStore};
use storefront_admin_api::{app, AppState};

pub const BUCKET: &str = "bucket-test";

/// The application served in-process on a free port, backed by in-memory
/// stores the test can inspect and sabotage.
pub struct TestServer {
    pub base_url: String,
    pub config: AppConfig,
    pub store: Arc<MemoryEntityStore>,
    pub objects: Arc<MemoryObjectStore>,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused@localhost/unused"),
        ("APPWRITE_API_URL", "https://storage.test/v1"),
        ("APPWRITE_PROJECT_ID", "project-test"),
        ("APPWRITE_API_KEY", "key-test"),
        ("APPWRITE_BUCKET_ID", BUCKET),
        ("JWT_SECRET_KEY", "integration-secret"),
        ("API_ENABLE_REQUEST_LOGGING", "false"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = test_config();
        let store = Arc::new(MemoryEntityStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let router = app(AppState::new(config.clone(), store.clone(), objects.clone()));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url,
            config,
            store,
            objects,
            client: reqwest::Client::new(),
            handle,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A valid admin token signed with the test secret.
    pub fn token(&self) -> String {
        let claims = Claims::new("admin-id".into(), "admin@shop.test".into(), true, None);
        generate_jwt(&claims, &self.config.security).expect("sign token")
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(self.token())
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(self.token())
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn send_form(&self, method: Method, path: &str, form: Form) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .request(method, self.url(path))
            .bearer_auth(self.token())
            .multipart(form)
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .request(method, self.url(path))
            .bearer_auth(self.token())
            .json(body)
            .send()
            .await?;
        Self::read(res).await
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
        let status = res.status();
        let body = res.json::<Value>().await.context("response was not JSON")?;
        Ok((status, body))
    }

    /// Put a file straight into the object store and return its asset URL.
    pub fn seed_file(&self, file_id: &str) -> String {
        self.objects
            .insert(BUCKET, file_id, FileUpload::new(file_id.as_bytes().to_vec(), "seed.png"));
        AssetUrlCodec::from_config(&self.config.storage).build_url(file_id)
    }

    /// Whether the object store holds the file an asset URL points at.
    pub fn holds(&self, url: &str) -> bool {
        AssetUrlCodec::extract_file_id(url)
            .map(|file_id| self.objects.contains(BUCKET, &file_id))
            .unwrap_or(false)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn image(filename: &str, bytes: &[u8]) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(filename.to_string())
        .mime_str("image/png")
        .expect("valid mime")
}

pub fn file_id(url: &str) -> String {
    AssetUrlCodec::extract_file_id(url).expect("asset url")
}
