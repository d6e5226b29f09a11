use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};

use crate::database::models::Product;
use crate::error::ApiError;
use crate::handlers::multipart::FormFields;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ProductForm;
use crate::workflow::SlotUpload;
use crate::AppState;

/// File fields, in slot order.
const IMAGE_FIELDS: [&str; 5] = ["image1", "image2", "image3", "image4", "image5"];

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<ProductForm, ApiError> {
    let mut fields = FormFields::read(multipart).await?;

    let images = IMAGE_FIELDS
        .iter()
        .enumerate()
        .filter_map(|(index, name)| fields.file(name).map(|file| SlotUpload::new(index + 1, file)))
        .collect();

    Ok(ProductForm {
        name: fields.text("name"),
        description: fields.text("description"),
        quantity: fields.text("quantity"),
        price: fields.text("price"),
        offer_price: fields.text("offerPrice"),
        pro_category_id: fields.text("proCategoryId"),
        pro_sub_category_id: fields.text("proSubCategoryId"),
        pro_brand_id: fields.text("proBrandId"),
        pro_variant_type_id: fields.text("proVariantTypeId"),
        pro_variant_id: fields.text_list("proVariantId"),
        images,
    })
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = state.products.list().await?;
    Ok(ApiResponse::success("Products retrieved successfully.", products))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    let product = state.products.get(&id).await?;
    Ok(ApiResponse::success("Product retrieved successfully.", product))
}

pub async fn post(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Product> {
    let form = read_form(multipart).await?;
    let product = state.products.create(form).await?;
    Ok(ApiResponse::success("Product created successfully.", product))
}

pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Product> {
    let form = read_form(multipart).await?;
    let product = state.products.update(&id, form).await?;
    Ok(ApiResponse::success("Product updated successfully.", product))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.products.delete(&id).await?;
    Ok(ApiResponse::message("Product deleted successfully."))
}
