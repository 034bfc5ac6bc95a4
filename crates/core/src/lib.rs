//! Domain logic for the stock catalog, free of any database dependency.

pub mod association;
pub mod error;
pub mod images;
pub mod pagination;
pub mod schema;
pub mod tags;
pub mod types;
pub mod variant_form;
