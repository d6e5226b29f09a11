use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::database::store::Collection;
use crate::workflow::{ImageOwner, ImageSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    #[serde(rename = "_id")]
    pub id: String,
    pub poster_name: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Poster {
    const COLLECTION: Collection = Collection::Posters;
}

impl ImageOwner for Poster {
    const SLOTS: usize = 1;

    fn image_set(&self) -> ImageSet {
        ImageSet::single(self.image_url.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoster {
    pub poster_name: String,
    pub product_id: Option<String>,
    pub image_url: Option<String>,
}

/// `product_id: Some(None)` unlinks the poster from its product.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
