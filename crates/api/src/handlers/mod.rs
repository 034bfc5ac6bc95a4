pub mod reference;
pub mod stock;
