use tracing::{info, warn};

use crate::database::models::{Category, CategoryPatch, NewCategory, Product, SubCategory};
use crate::database::{FieldFilter, Repository};
use crate::error::ApiError;
use crate::services::non_blank;
use crate::storage::FileUpload;
use crate::workflow::{ImageOwner, ImageWorkflow, SlotUpload};

const NOT_FOUND: &str = "Category not found.";

/// Fields of a category create or update request.
#[derive(Debug, Default)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<FileUpload>,
}

#[derive(Clone)]
pub struct CategoryService {
    categories: Repository<Category>,
    subcategories: Repository<SubCategory>,
    products: Repository<Product>,
    images: ImageWorkflow,
}

impl CategoryService {
    pub fn new(
        categories: Repository<Category>,
        subcategories: Repository<SubCategory>,
        products: Repository<Product>,
        images: ImageWorkflow,
    ) -> Self {
        Self {
            categories,
            subcategories,
            products,
            images,
        }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ApiError> {
        Ok(self.categories.list(FieldFilter::all()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Category, ApiError> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, form: CategoryForm) -> Result<Category, ApiError> {
        let name = non_blank(form.name)
            .ok_or_else(|| ApiError::missing_fields("Name is required.", &["name"]))?;
        let image = form
            .image
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

        let categories = &self.categories;
        let category = self
            .images
            .create(Category::SLOTS, vec![SlotUpload::new(1, image)], move |assets| async move {
                let new = NewCategory {
                    name,
                    image: assets.into_iter().next().map(|asset| asset.url),
                };
                categories.create(&new).await.map_err(ApiError::from)
            })
            .await?;

        info!("Created category {}", category.id);
        Ok(category)
    }

    pub async fn update(&self, id: &str, form: CategoryForm) -> Result<Category, ApiError> {
        let name = non_blank(form.name);

        let Some(image) = form.image else {
            let patch = CategoryPatch {
                name,
                image: non_blank(form.image_url),
            };
            return self
                .categories
                .update(id, &patch)
                .await?
                .ok_or_else(|| ApiError::not_found(NOT_FOUND));
        };

        let current = self.get(id).await?;
        let categories = &self.categories;
        self.images
            .replace(&current, vec![SlotUpload::new(1, image)], move |assets| async move {
                let patch = CategoryPatch {
                    name,
                    image: assets.into_iter().next().map(|asset| asset.url),
                };
                categories
                    .update(id, &patch)
                    .await?
                    .ok_or_else(|| ApiError::not_found(NOT_FOUND))
            })
            .await
    }

    /// Refuses with 409 while subcategories or products reference the category.
    pub async fn delete(&self, id: &str) -> Result<Category, ApiError> {
        if self
            .subcategories
            .exists(FieldFilter::all().eq("categoryId", id))
            .await?
        {
            return Err(ApiError::conflict(
                "Cannot delete category. Subcategories are referencing it.",
            ));
        }
        if self
            .products
            .exists(FieldFilter::all().eq("proCategoryId", id))
            .await?
        {
            return Err(ApiError::conflict(
                "Cannot delete category. Products are referencing it.",
            ));
        }

        let category = self
            .categories
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        let report = self.images.release(category.asset_urls()).await;
        if !report.is_clean() {
            warn!("Category {} deleted with leftover files: {:?}", id, report.failed);
        }
        Ok(category)
    }
}
