//! Stock header rows and the denormalized list view.

use serde::Serialize;
use sqlx::FromRow;
use stockroom_core::types::{DbId, Timestamp};
use validator::Validate;

use crate::models::audit::Author;
use crate::models::reference::ReferenceRow;
use crate::models::stock_color::StockColorWithSchemes;

// ---------------------------------------------------------------------------
// Entity struct
// ---------------------------------------------------------------------------

/// A row from the `stock` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Stock {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub enable: bool,
    pub series_id: DbId,
    pub supplier_id: Option<DbId>,
    pub main_image: Option<String>,
    pub block: Option<String>,
    pub absorption: Option<String>,
    pub create_id: String,
    pub create_name: String,
    pub modify_id: Option<String>,
    pub modify_name: Option<String>,
    pub create_time: Timestamp,
    pub modify_time: Timestamp,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Validated stock header, produced by the validation gate.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct StockHeaderInput {
    #[validate(length(min = 1, max = 15))]
    pub name: String,
    #[validate(length(min = 1, max = 15))]
    pub code: String,
    pub description: Option<String>,
    pub enable: bool,
    #[validate(range(min = 1, message = "series is required"))]
    pub series_id: DbId,
    pub supplier_id: Option<DbId>,
    #[validate(length(max = 2048))]
    pub main_image: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub block: Option<i16>,
    #[validate(range(min = 1, max = 5))]
    pub absorption: Option<i16>,
    #[validate(nested)]
    pub author: Author,
}

// ---------------------------------------------------------------------------
// List view
// ---------------------------------------------------------------------------

/// One stock with every relation resolved, as returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StockDetail {
    #[serde(flatten)]
    pub stock: Stock,
    pub series: Option<ReferenceRow>,
    pub supplier: Option<ReferenceRow>,
    pub material: Vec<ReferenceRow>,
    pub design: Vec<ReferenceRow>,
    pub environment: Vec<ReferenceRow>,
    pub colors: Vec<StockColorWithSchemes>,
    /// Every color scheme reached by any variant, without duplicates.
    pub color_schemes: Vec<ReferenceRow>,
}
