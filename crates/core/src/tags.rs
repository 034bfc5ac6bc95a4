//! The three structurally identical tag relations of a stock.

use serde::Serialize;

use crate::schema::catalog;
use crate::schema::EntityName;

/// A many-to-many tag relation between `Stock` and a reference entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Material,
    Design,
    Environment,
}

impl TagKind {
    pub const ALL: [TagKind; 3] = [TagKind::Material, TagKind::Design, TagKind::Environment];

    /// Form field carrying the submitted id list; also used as the stage
    /// label in progress messages and as the key in list responses.
    pub fn field_name(self) -> &'static str {
        match self {
            TagKind::Material => "material",
            TagKind::Design => "design",
            TagKind::Environment => "environment",
        }
    }

    /// Target entity, used to look up the junction in the association graph.
    pub fn entity(self) -> EntityName {
        match self {
            TagKind::Material => catalog::MATERIAL,
            TagKind::Design => catalog::DESIGN,
            TagKind::Environment => catalog::ENVIRONMENT,
        }
    }
}
