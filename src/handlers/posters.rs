use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};

use crate::database::models::Poster;
use crate::error::ApiError;
use crate::handlers::multipart::FormFields;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::PosterForm;
use crate::AppState;

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<PosterForm, ApiError> {
    let mut fields = FormFields::read(multipart).await?;
    Ok(PosterForm {
        poster_name: fields.text("posterName"),
        product_id: fields.text("productId"),
        image_url: fields.text("imageUrl"),
        image: fields.file("image"),
    })
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Poster>> {
    let posters = state.posters.list().await?;
    Ok(ApiResponse::success("Posters retrieved successfully.", posters))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Poster> {
    let poster = state.posters.get(&id).await?;
    Ok(ApiResponse::success("Poster retrieved successfully.", poster))
}

pub async fn post(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Poster> {
    let form = read_form(multipart).await?;
    let poster = state.posters.create(form).await?;
    Ok(ApiResponse::success("Poster created successfully.", poster))
}

pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Poster> {
    let form = read_form(multipart).await?;
    let poster = state.posters.update(&id, form).await?;
    Ok(ApiResponse::success("Poster updated successfully.", poster))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.posters.delete(&id).await?;
    Ok(ApiResponse::message("Poster deleted successfully."))
}
