use thiserror::Error;

use stockpos_core::ProductId;

/// Failure of a sale creation, as seen by the caller.
///
/// Optimistic-concurrency conflicts are retried inside the transaction and
/// never show up here as their own variant; once retries are exhausted they
/// surface as [`SaleError::Unavailable`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaleError {
    /// Quantity was zero or negative. Rejected before touching storage.
    #[error("quantity must be a positive integer (got {0})")]
    InvalidQuantity(i64),

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    /// Storage failure or contention that outlasted the retry budget.
    #[error("sale could not be completed: {0}")]
    Unavailable(String),
}

impl SaleError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether the caller's request itself was wrong (as opposed to the service).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SaleError::Unavailable(_))
    }
}
