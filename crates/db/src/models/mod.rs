//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize`/`Validate` input DTOs for inserts and updates

pub mod audit;
pub mod reference;
pub mod stock;
pub mod stock_color;
