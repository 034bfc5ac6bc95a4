//! Simple reference entities: series, supplier, tags, colors.
//!
//! All seven share one column layout (`code`, `name`, `description`,
//! `enable`, `comment` plus audit columns), so a single row struct and a
//! single generic repository serve them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::schema::{catalog, EntityName};
use stockroom_core::tags::TagKind;
use stockroom_core::types::DbId;
use validator::Validate;

use crate::models::audit::Author;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// A reference entity, addressed by its kebab-case path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceEntity {
    Series,
    Supplier,
    Material,
    Design,
    Environment,
    ColorName,
    ColorScheme,
}

impl ReferenceEntity {
    pub const ALL: [ReferenceEntity; 7] = [
        ReferenceEntity::Series,
        ReferenceEntity::Supplier,
        ReferenceEntity::Material,
        ReferenceEntity::Design,
        ReferenceEntity::Environment,
        ReferenceEntity::ColorName,
        ReferenceEntity::ColorScheme,
    ];

    pub fn table(self) -> &'static str {
        match self {
            ReferenceEntity::Series => "series",
            ReferenceEntity::Supplier => "supplier",
            ReferenceEntity::Material => "material",
            ReferenceEntity::Design => "design",
            ReferenceEntity::Environment => "environment",
            ReferenceEntity::ColorName => "color_name",
            ReferenceEntity::ColorScheme => "color_scheme",
        }
    }

    pub fn entity(self) -> EntityName {
        match self {
            ReferenceEntity::Series => catalog::SERIES,
            ReferenceEntity::Supplier => catalog::SUPPLIER,
            ReferenceEntity::Material => catalog::MATERIAL,
            ReferenceEntity::Design => catalog::DESIGN,
            ReferenceEntity::Environment => catalog::ENVIRONMENT,
            ReferenceEntity::ColorName => catalog::COLOR_NAME,
            ReferenceEntity::ColorScheme => catalog::COLOR_SCHEME,
        }
    }

    /// Series and suppliers carry a mandatory unique code.
    pub fn requires_code(self) -> bool {
        matches!(self, ReferenceEntity::Series | ReferenceEntity::Supplier)
    }
}

impl From<TagKind> for ReferenceEntity {
    fn from(kind: TagKind) -> Self {
        match kind {
            TagKind::Material => ReferenceEntity::Material,
            TagKind::Design => ReferenceEntity::Design,
            TagKind::Environment => ReferenceEntity::Environment,
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from any reference table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ReferenceRow {
    pub id: DbId,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub enable: bool,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for creating a reference row.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReference {
    #[validate(length(min = 1, max = 15))]
    pub name: String,
    #[validate(length(min = 1, max = 15))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub enable: Option<bool>,
    pub comment: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub author: Author,
}

/// An id as submitted by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(DbId),
    Text(String),
}

impl RawId {
    /// The id when it is a positive integer.
    pub fn parse(&self) -> Option<DbId> {
        match self {
            RawId::Number(id) => Some(*id),
            RawId::Text(s) => s.trim().parse().ok(),
        }
        .filter(|id| *id > 0)
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Number(id) => write!(f, "{id}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

/// Input for updating a reference row. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReference {
    pub id: RawId,
    #[validate(length(min = 1, max = 15))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 15))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub enable: Option<bool>,
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "modify_id is required"))]
    pub modify_id: String,
    #[validate(length(min = 1, message = "modify_name is required"))]
    pub modify_name: String,
}
