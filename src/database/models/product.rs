use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::repository::Entity;
use crate::database::store::Collection;
use crate::workflow::{ImageOwner, ImageSet, UploadedAsset};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub offer_price: Option<f64>,
    pub pro_category_id: String,
    pub pro_sub_category_id: String,
    #[serde(default)]
    pub pro_brand_id: Option<String>,
    #[serde(default)]
    pub pro_variant_type_id: Option<String>,
    #[serde(default)]
    pub pro_variant_id: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One populated image slot. `image` is the 1-based slot number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub image: usize,
    pub url: String,
}

impl Entity for Product {
    const COLLECTION: Collection = Collection::Products;
}

impl ImageOwner for Product {
    const SLOTS: usize = 5;

    fn image_set(&self) -> ImageSet {
        let mut set = ImageSet::empty(Self::SLOTS);
        for entry in &self.images {
            // Out-of-range entries have no slot; `asset_urls` still sees them.
            set.set(entry.image, Some(entry.url.clone()));
        }
        set
    }

    /// Every stored entry, so duplicated or out-of-range slots are still
    /// released on delete.
    fn asset_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::with_capacity(self.images.len());
        for entry in &self.images {
            if !urls.contains(&entry.url) {
                urls.push(entry.url.clone());
            }
        }
        urls
    }
}

impl Product {
    /// The image list after writing `assets` into their slots. Every existing
    /// entry for a written slot is dropped; entries for other slots are
    /// carried over unchanged.
    pub fn images_with(&self, assets: &[UploadedAsset]) -> Vec<ProductImage> {
        let mut images: Vec<ProductImage> = self
            .images
            .iter()
            .filter(|entry| assets.iter().all(|asset| asset.slot != entry.image))
            .cloned()
            .collect();
        images.extend(assets.iter().map(ProductImage::from));
        images.sort_by_key(|entry| entry.image);
        images
    }
}

impl From<&UploadedAsset> for ProductImage {
    fn from(asset: &UploadedAsset) -> Self {
        Self {
            image: asset.slot,
            url: asset.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub offer_price: Option<f64>,
    pub pro_category_id: String,
    pub pro_sub_category_id: String,
    pub pro_brand_id: Option<String>,
    pub pro_variant_type_id: Option<String>,
    pub pro_variant_id: Vec<String>,
    pub images: Vec<ProductImage>,
}

/// Absent fields keep their stored value. For the optional ones, `Some(None)`
/// writes `null`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_sub_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_brand_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_variant_type_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_variant_id: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ProductImage>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(images: Vec<(usize, &str)>) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".into(),
            name: "Shoe".into(),
            description: None,
            quantity: 1,
            price: 10.0,
            offer_price: None,
            pro_category_id: "c".into(),
            pro_sub_category_id: "s".into(),
            pro_brand_id: None,
            pro_variant_type_id: None,
            pro_variant_id: vec![],
            images: images
                .into_iter()
                .map(|(image, url)| ProductImage { image, url: url.into() })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn asset(slot: usize, url: &str) -> UploadedAsset {
        UploadedAsset {
            slot,
            file_id: format!("f{}", slot),
            url: url.into(),
        }
    }

    #[test]
    fn images_with_replaces_only_the_given_slot() {
        let p = product(vec![(1, "u1"), (2, "u2"), (3, "u3"), (4, "u4"), (5, "u5")]);
        let images = p.images_with(&[asset(3, "new3")]);

        assert_eq!(images[2], ProductImage { image: 3, url: "new3".into() });
        for (i, entry) in images.iter().enumerate().filter(|(i, _)| *i != 2) {
            assert_eq!(entry, &p.images[i]);
        }
    }

    #[test]
    fn images_with_fills_empty_slots_in_order() {
        let p = product(vec![(1, "u1"), (4, "u4")]);
        let images = p.images_with(&[asset(2, "n2")]);
        let slots: Vec<usize> = images.iter().map(|e| e.image).collect();
        assert_eq!(slots, vec![1, 2, 4]);
    }

    #[test]
    fn images_with_collapses_duplicate_entries_of_a_written_slot() {
        let p = product(vec![(1, "a1"), (1, "a2"), (2, "b")]);
        let images = p.images_with(&[asset(1, "new")]);
        assert_eq!(
            images,
            vec![
                ProductImage { image: 1, url: "new".into() },
                ProductImage { image: 2, url: "b".into() },
            ]
        );
    }

    #[test]
    fn asset_urls_include_duplicate_and_out_of_range_entries() {
        let p = product(vec![(1, "a1"), (1, "a2"), (6, "a6"), (2, "a1")]);
        assert_eq!(p.asset_urls(), vec!["a1".to_string(), "a2".into(), "a6".into()]);
        assert_eq!(p.image_set().urls(), vec!["a2".to_string(), "a1".into()]);
    }

    #[test]
    fn image_set_maps_entries_to_slots() {
        let set = product(vec![(2, "u2"), (5, "u5")]).image_set();
        assert_eq!(set.capacity(), 5);
        assert_eq!(set.get(2), Some("u2"));
        assert_eq!(set.get(1), None);
    }
}
