use std::str::FromStr;
use tracing::{info, warn};

use crate::database::models::{NewProduct, Product, ProductImage, ProductPatch};
use crate::database::{FieldFilter, Repository};
use crate::error::ApiError;
use crate::services::{clearable, non_blank};
use crate::workflow::{ImageOwner, ImageWorkflow, SlotUpload};

const NOT_FOUND: &str = "Product not found.";

/// Raw product fields as submitted. Numbers are parsed by the service so that
/// create and update report bad input the same way.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub offer_price: Option<String>,
    pub pro_category_id: Option<String>,
    pub pro_sub_category_id: Option<String>,
    pub pro_brand_id: Option<String>,
    pub pro_variant_type_id: Option<String>,
    pub pro_variant_id: Option<Vec<String>>,
    pub images: Vec<SlotUpload>,
}

/// Parsed scalar fields shared by create and update. Optional fields are
/// doubly wrapped: the outer `None` leaves the stored value alone, `Some(None)`
/// clears it.
struct ProductFields {
    name: Option<String>,
    description: Option<Option<String>>,
    quantity: Option<i64>,
    price: Option<f64>,
    offer_price: Option<Option<f64>>,
    pro_category_id: Option<String>,
    pro_sub_category_id: Option<String>,
    pro_brand_id: Option<Option<String>>,
    pro_variant_type_id: Option<Option<String>>,
    pro_variant_id: Option<Vec<String>>,
}

impl ProductFields {
    fn parse(form: ProductForm) -> Result<(Self, Vec<SlotUpload>), ApiError> {
        let fields = Self {
            name: non_blank(form.name),
            description: clearable(form.description),
            quantity: parse_number("quantity", form.quantity)?,
            price: parse_price("price", form.price)?,
            offer_price: form
                .offer_price
                .map(|raw| parse_price("offerPrice", Some(raw)))
                .transpose()?,
            pro_category_id: non_blank(form.pro_category_id),
            pro_sub_category_id: non_blank(form.pro_sub_category_id),
            pro_brand_id: clearable(form.pro_brand_id),
            pro_variant_type_id: clearable(form.pro_variant_type_id),
            pro_variant_id: form.pro_variant_id.map(|ids| {
                ids.into_iter()
                    .filter_map(|id| non_blank(Some(id)))
                    .collect()
            }),
        };
        Ok((fields, form.images))
    }

    fn into_patch(self) -> ProductPatch {
        ProductPatch {
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            price: self.price,
            offer_price: self.offer_price,
            pro_category_id: self.pro_category_id,
            pro_sub_category_id: self.pro_sub_category_id,
            pro_brand_id: self.pro_brand_id,
            pro_variant_type_id: self.pro_variant_type_id,
            pro_variant_id: self.pro_variant_id,
            images: None,
        }
    }
}

fn invalid_number(field: &str, value: &str) -> ApiError {
    ApiError::validation_error(
        format!("Field '{}' must be a number", field),
        Some([(field.to_string(), format!("invalid number: {}", value))].into()),
    )
}

fn parse_number<T: FromStr>(field: &str, raw: Option<String>) -> Result<Option<T>, ApiError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| invalid_number(field, &value)),
    }
}

/// Like `parse_number`, but NaN and the infinities are rejected: JSON has no
/// encoding for them and they would be stored as `null`.
fn parse_price(field: &str, raw: Option<String>) -> Result<Option<f64>, ApiError> {
    match parse_number::<f64>(field, raw)? {
        Some(price) if !price.is_finite() => Err(invalid_number(field, &price.to_string())),
        price => Ok(price),
    }
}

#[derive(Clone)]
pub struct ProductService {
    products: Repository<Product>,
    images: ImageWorkflow,
}

impl ProductService {
    pub fn new(products: Repository<Product>, images: ImageWorkflow) -> Self {
        Self { products, images }
    }

    pub async fn list(&self) -> Result<Vec<Product>, ApiError> {
        Ok(self.products.list(FieldFilter::all()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Product, ApiError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, form: ProductForm) -> Result<Product, ApiError> {
        let (fields, uploads) = ProductFields::parse(form)?;

        let mut missing = Vec::new();
        if fields.name.is_none() {
            missing.push("name");
        }
        if fields.quantity.is_none() {
            missing.push("quantity");
        }
        if fields.price.is_none() {
            missing.push("price");
        }
        if fields.pro_category_id.is_none() {
            missing.push("proCategoryId");
        }
        if fields.pro_sub_category_id.is_none() {
            missing.push("proSubCategoryId");
        }

        let (Some(name), Some(quantity), Some(price), Some(pro_category_id), Some(pro_sub_category_id)) = (
            fields.name,
            fields.quantity,
            fields.price,
            fields.pro_category_id,
            fields.pro_sub_category_id,
        ) else {
            return Err(ApiError::missing_fields("Required fields are missing.", &missing));
        };

        let mut new = NewProduct {
            name,
            description: fields.description.flatten(),
            quantity,
            price,
            offer_price: fields.offer_price.flatten(),
            pro_category_id,
            pro_sub_category_id,
            pro_brand_id: fields.pro_brand_id.flatten(),
            pro_variant_type_id: fields.pro_variant_type_id.flatten(),
            pro_variant_id: fields.pro_variant_id.unwrap_or_default(),
            images: Vec::new(),
        };

        let products = &self.products;
        let product = self
            .images
            .create(Product::SLOTS, uploads, move |assets| async move {
                new.images = assets.iter().map(ProductImage::from).collect();
                products.create(&new).await.map_err(ApiError::from)
            })
            .await?;

        info!("Created product {} with {} image(s)", product.id, product.images.len());
        Ok(product)
    }

    /// Scalars in the form overwrite stored ones; each supplied `imageN`
    /// replaces slot N and leaves every other slot as stored.
    pub async fn update(&self, id: &str, form: ProductForm) -> Result<Product, ApiError> {
        let (fields, uploads) = ProductFields::parse(form)?;
        let mut patch = fields.into_patch();

        if uploads.is_empty() {
            return self
                .products
                .update(id, &patch)
                .await?
                .ok_or_else(|| ApiError::not_found(NOT_FOUND));
        }

        let current = self.get(id).await?;
        let products = &self.products;
        let current_ref = &current;
        self.images
            .replace(&current, uploads, move |assets| async move {
                patch.images = Some(current_ref.images_with(&assets));
                products
                    .update(id, &patch)
                    .await?
                    .ok_or_else(|| ApiError::not_found(NOT_FOUND))
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Product, ApiError> {
        let product = self
            .products
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        let report = self.images.release(product.asset_urls()).await;
        info!(
            "Deleted product {}: {} file(s) removed, {} already missing",
            id,
            report.deleted.len(),
            report.missing.len()
        );
        if !report.is_clean() {
            warn!("Product {} deleted with leftover files: {:?}", id, report.failed);
        }
        Ok(product)
    }
}
