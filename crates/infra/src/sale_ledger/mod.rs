//! Append-only sale ledger.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemorySaleLedger;
pub use r#trait::SaleLedger;
