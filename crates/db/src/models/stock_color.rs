//! Stock color variants.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::FromRow;
use stockroom_core::images::{ImageRef, ImageSlot, VariantImages};
use stockroom_core::types::{DbId, Timestamp};

use crate::models::reference::ReferenceRow;

/// A row from the `stock_color` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct StockColor {
    pub id: DbId,
    pub stock_id: DbId,
    pub color_name_id: DbId,
    /// Display name copied from the color at write time.
    pub name: String,
    pub stock_image: String,
    pub stock_image_name: String,
    pub color_image: String,
    pub color_image_name: String,
    pub removal_image: String,
    pub removal_image_name: String,
    pub create_id: String,
    pub create_name: String,
    pub modify_id: Option<String>,
    pub modify_name: Option<String>,
    pub create_time: Timestamp,
    pub modify_time: Timestamp,
}

impl StockColor {
    pub fn images(&self) -> VariantImages {
        let image = |path: &str, original_name: &str| ImageRef {
            path: path.to_string(),
            original_name: original_name.to_string(),
        };
        VariantImages {
            stock: image(&self.stock_image, &self.stock_image_name),
            color: image(&self.color_image, &self.color_image_name),
            removal: image(&self.removal_image, &self.removal_image_name),
        }
    }
}

/// Input for inserting a variant. All three images are mandatory.
#[derive(Debug, Clone)]
pub struct NewStockColor {
    pub stock_id: DbId,
    pub color_name_id: DbId,
    pub name: String,
    pub images: VariantImages,
}

/// Input for updating a variant. Only the slots present in `images` are
/// replaced; the others keep their stored file.
#[derive(Debug, Clone)]
pub struct StockColorUpdate {
    pub color_name_id: DbId,
    pub name: String,
    pub images: HashMap<ImageSlot, ImageRef>,
}

impl StockColorUpdate {
    pub fn image(&self, slot: ImageSlot) -> Option<&ImageRef> {
        self.images.get(&slot)
    }
}

/// A variant together with its resolved color schemes.
#[derive(Debug, Clone, Serialize)]
pub struct StockColorWithSchemes {
    #[serde(flatten)]
    pub color: StockColor,
    pub color_schemes: Vec<ReferenceRow>,
}
