//! Audit columns shared by every table.

use serde::Deserialize;
use validator::Validate;

/// Who is writing a row. Creator fields are stamped on inserts, modifier
/// fields on every write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct Author {
    #[validate(length(min = 1, message = "create_id is required"))]
    pub create_id: String,
    #[validate(length(min = 1, message = "create_name is required"))]
    pub create_name: String,
    pub modify_id: Option<String>,
    pub modify_name: Option<String>,
}

impl Author {
    /// Modifier id, falling back to the creator.
    pub fn modify_id(&self) -> &str {
        self.modify_id.as_deref().unwrap_or(&self.create_id)
    }

    /// Modifier name, falling back to the creator.
    pub fn modify_name(&self) -> &str {
        self.modify_name.as_deref().unwrap_or(&self.create_name)
    }
}
