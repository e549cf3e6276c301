//! Products domain module.
//!
//! This crate contains business rules for the product catalog, implemented
//! purely as deterministic domain logic (no IO, no locking, no storage).

pub mod product;

pub use product::{NewProduct, Product, ProductPatch, ProductRecord, StockError};
