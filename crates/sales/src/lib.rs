//! Sales domain module.
//!
//! Sale records, the validated sale quantity, ledger filters, profit
//! summaries and the caller-facing error taxonomy of sale creation. Pure
//! domain logic: no IO, no locking, no storage.

pub mod error;
pub mod query;
pub mod sale;
pub mod summary;

pub use error::SaleError;
pub use query::SaleFilter;
pub use sale::{NewSale, Sale, SaleQuantity};
pub use summary::{
    ParsePeriodError, PeriodSummary, ProductSummary, SalesSummary, SummaryPeriod, SummaryTotals,
};
