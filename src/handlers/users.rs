use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;

use crate::database::models::UserView;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest};
use crate::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success("Users retrieved successfully.", users))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserView> {
    let user = state.users.get(&id).await?;
    Ok(ApiResponse::success("User retrieved successfully.", user))
}

/// POST /users/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserView> {
    let user = state.users.register(body(payload)?).await?;
    Ok(ApiResponse::success("User created successfully.", user))
}

/// POST /users/login - returns the user and a bearer token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let session = state.users.login(body(payload)?).await?;
    Ok(ApiResponse::success("Login successful.", session))
}

pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<UserView> {
    let user = state.users.update(&id, body(payload)?).await?;
    Ok(ApiResponse::success("User updated successfully.", user))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.users.delete(&id).await?;
    Ok(ApiResponse::message("User deleted successfully."))
}
