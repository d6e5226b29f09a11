use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::database::store::Collection;
use crate::workflow::{ImageOwner, ImageSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    const COLLECTION: Collection = Collection::Categories;
}

impl ImageOwner for Category {
    const SLOTS: usize = 1;

    fn image_set(&self) -> ImageSet {
        ImageSet::single(self.image.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
