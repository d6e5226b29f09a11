use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "message": "Storefront admin API",
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": version,
            "endpoints": {
                "health": "/health (public)",
                "users": "/users, /users/:id, /users/register, /users/login",
                "categories": "/categories[/:id] (protected)",
                "posters": "/posters[/:id] (protected)",
                "products": "/products[/:id] (protected)",
            }
        }
    }))
}

/// 200 when the entity store answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "ok",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiError::service_unavailable("database unavailable").into_response()
        }
    }
}
