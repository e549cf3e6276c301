//! Infrastructure layer: product/sale storage and the sale transaction.

pub mod error;
pub mod product_store;
pub mod sale_ledger;
pub mod sale_transaction;
pub mod seed;
pub mod storage;

#[cfg(feature = "postgres")]
pub mod postgres;


pub use error::StoreError;
pub use product_store::{InMemoryProductStore, ProductStore};
pub use sale_ledger::{InMemorySaleLedger, SaleLedger};
pub use sale_transaction::{DEFAULT_MAX_ATTEMPTS, SaleTransaction};
pub use seed::seed_demo_catalog;
pub use storage::{InMemorySaleStorage, SaleStorage};

#[cfg(feature = "postgres")]
pub use postgres::PostgresSaleStore;
