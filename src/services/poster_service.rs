use tracing::{info, warn};

use crate::database::models::{NewPoster, Poster, PosterPatch};
use crate::database::{FieldFilter, Repository};
use crate::error::ApiError;
use crate::services::{clearable, non_blank};
use crate::storage::FileUpload;
use crate::workflow::{ImageOwner, ImageWorkflow, SlotUpload};

const NOT_FOUND: &str = "Poster not found.";

#[derive(Debug, Default)]
pub struct PosterForm {
    pub poster_name: Option<String>,
    pub product_id: Option<String>,
    pub image_url: Option<String>,
    pub image: Option<FileUpload>,
}

#[derive(Clone)]
pub struct PosterService {
    posters: Repository<Poster>,
    images: ImageWorkflow,
}

impl PosterService {
    pub fn new(posters: Repository<Poster>, images: ImageWorkflow) -> Self {
        Self { posters, images }
    }

    pub async fn list(&self) -> Result<Vec<Poster>, ApiError> {
        Ok(self.posters.list(FieldFilter::all()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Poster, ApiError> {
        self.posters
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, form: PosterForm) -> Result<Poster, ApiError> {
        let poster_name = non_blank(form.poster_name)
            .ok_or_else(|| ApiError::missing_fields("Name is required.", &["posterName"]))?;
        let image = form
            .image
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
        let product_id = non_blank(form.product_id);

        let posters = &self.posters;
        let poster = self
            .images
            .create(Poster::SLOTS, vec![SlotUpload::new(1, image)], move |assets| async move {
                let new = NewPoster {
                    poster_name,
                    product_id,
                    image_url: assets.into_iter().next().map(|asset| asset.url),
                };
                posters.create(&new).await.map_err(ApiError::from)
            })
            .await?;

        info!("Created poster {}", poster.id);
        Ok(poster)
    }

    /// Without a file only the supplied fields change. With a file the stored
    /// image is replaced; a client `imageUrl` is not needed and is ignored.
    pub async fn update(&self, id: &str, form: PosterForm) -> Result<Poster, ApiError> {
        let mut patch = PosterPatch {
            poster_name: non_blank(form.poster_name),
            product_id: clearable(form.product_id),
            image_url: None,
        };

        let Some(image) = form.image else {
            patch.image_url = non_blank(form.image_url);
            return self
                .posters
                .update(id, &patch)
                .await?
                .ok_or_else(|| ApiError::not_found(NOT_FOUND));
        };

        let current = self.get(id).await?;
        let posters = &self.posters;
        self.images
            .replace(&current, vec![SlotUpload::new(1, image)], move |assets| async move {
                patch.image_url = assets.into_iter().next().map(|asset| asset.url);
                posters
                    .update(id, &patch)
                    .await?
                    .ok_or_else(|| ApiError::not_found(NOT_FOUND))
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Poster, ApiError> {
        let poster = self
            .posters
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        let report = self.images.release(poster.asset_urls()).await;
        if !report.is_clean() {
            warn!("Poster {} deleted with leftover files: {:?}", id, report.failed);
        }
        Ok(poster)
    }
}
