//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod junction_repo;
pub mod reference_repo;
pub mod stock_color_repo;
pub mod stock_repo;

pub use junction_repo::JunctionRepo;
pub use reference_repo::ReferenceRepo;
pub use stock_color_repo::StockColorRepo;
pub use stock_repo::StockRepo;
