use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};

use crate::database::models::Category;
use crate::error::ApiError;
use crate::handlers::multipart::FormFields;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::CategoryForm;
use crate::AppState;

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<CategoryForm, ApiError> {
    let mut fields = FormFields::read(multipart).await?;
    Ok(CategoryForm {
        name: fields.text("name"),
        image_url: fields.text("imageUrl"),
        image: fields.file("image"),
    })
}

/// GET /categories
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state.categories.list().await?;
    Ok(ApiResponse::success("Categories retrieved successfully.", categories))
}

/// GET /categories/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Category> {
    let category = state.categories.get(&id).await?;
    Ok(ApiResponse::success("Category retrieved successfully.", category))
}

/// POST /categories - multipart `name` and `image`
pub async fn post(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Category> {
    let form = read_form(multipart).await?;
    let category = state.categories.create(form).await?;
    Ok(ApiResponse::success("Category created successfully.", category))
}

/// PUT /categories/:id - multipart `name`, `imageUrl`, `image`, all optional
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Category> {
    let form = read_form(multipart).await?;
    let category = state.categories.update(&id, form).await?;
    Ok(ApiResponse::success("Category updated successfully.", category))
}

/// DELETE /categories/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.categories.delete(&id).await?;
    Ok(ApiResponse::message("Category deleted successfully."))
}
