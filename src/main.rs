use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storefront_admin_api::config::AppConfig;
use storefront_admin_api::database::{DatabaseManager, PgEntityStore};
use storefront_admin_api::storage::AppwriteStorage;
use storefront_admin_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, APPWRITE_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting storefront admin API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::ensure_schema(&pool).await?;
    let store = Arc::new(PgEntityStore::new(pool));
    let objects = Arc::new(AppwriteStorage::new(&config.storage)?);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = app(AppState::new(config, store, objects));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
