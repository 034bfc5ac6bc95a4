//! Validation gate: form fields to a validated stock header.

use std::str::FromStr;

use stockroom_core::types::DbId;
use stockroom_core::variant_form::{first_value, FieldBag};
use validator::Validate;

use super::StockSyncError;
use crate::models::audit::Author;
use crate::models::stock::StockHeaderInput;

fn rejected(message: impl Into<String>) -> StockSyncError {
    StockSyncError::ValidationRejected(message.into())
}

fn text(fields: &FieldBag, name: &str) -> Option<String> {
    first_value(fields, name).map(str::to_string)
}

fn number<T: FromStr>(fields: &FieldBag, name: &str) -> Result<Option<T>, StockSyncError> {
    first_value(fields, name)
        .map(|v| v.parse::<T>().map_err(|_| rejected(format!("{name} must be a number"))))
        .transpose()
}

fn flag(fields: &FieldBag, name: &str, default: bool) -> Result<bool, StockSyncError> {
    match first_value(fields, name).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "on") => Ok(true),
        Some("false" | "0" | "off") => Ok(false),
        Some(_) => Err(rejected(format!("{name} must be a boolean"))),
    }
}

/// Audit fields of a form. Missing creator fields fall back to the modifier,
/// so update forms may carry only `modify_id`/`modify_name`.
pub fn author(fields: &FieldBag) -> Author {
    let modify_id = text(fields, "modify_id");
    let modify_name = text(fields, "modify_name");
    Author {
        create_id: text(fields, "create_id")
            .or_else(|| modify_id.clone())
            .unwrap_or_default(),
        create_name: text(fields, "create_name")
            .or_else(|| modify_name.clone())
            .unwrap_or_default(),
        modify_id,
        modify_name,
    }
}

/// Build and validate the stock header from a form.
///
/// `series` (or `series_id`) is required; a `supplier` of `0` means none.
pub fn validate_header(fields: &FieldBag) -> Result<StockHeaderInput, StockSyncError> {
    let series_id: Option<DbId> = match number(fields, "series")? {
        Some(id) => Some(id),
        None => number(fields, "series_id")?,
    };
    let supplier_id: Option<DbId> = match number(fields, "supplier")? {
        Some(id) => Some(id),
        None => number(fields, "supplier_id")?,
    };

    let input = StockHeaderInput {
        name: text(fields, "name").unwrap_or_default(),
        code: text(fields, "code").unwrap_or_default(),
        description: text(fields, "description"),
        enable: flag(fields, "enable", true)?,
        series_id: series_id.unwrap_or(0),
        supplier_id: supplier_id.filter(|id| *id != 0),
        main_image: text(fields, "main_image"),
        block: number(fields, "block")?,
        absorption: number(fields, "absorption")?,
        author: author(fields),
    };

    input.validate().map_err(|e| rejected(e.to_string()))?;
    Ok(input)
}
