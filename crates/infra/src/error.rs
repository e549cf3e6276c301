use thiserror::Error;

use stockpos_core::{DomainError, ProductId};
use stockpos_products::StockError;

/// Storage operation error.
///
/// These are **infrastructure errors** (missing rows, stale versions, lost
/// backends) as opposed to caller-facing sale errors.
///
/// - **Concurrency**: optimistic check failed (version mismatch) or the backend
///   reported a serialization failure; the operation may be retried
/// - **NotFound / InsufficientStock**: deterministic outcomes of the stored state
/// - **Validation**: input rejected by domain rules
/// - **Unavailable**: poisoned lock, lost connection, anything else
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}

impl From<StockError> for StoreError {
    fn from(value: StockError) -> Self {
        match value {
            StockError::ZeroAmount => StoreError::Validation(value.to_string()),
            StockError::Insufficient {
                requested,
                available,
            } => StoreError::InsufficientStock {
                requested,
                available,
            },
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Validation(msg),
            DomainError::Conflict(msg) => StoreError::Concurrency(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use stockpos_core::ExpectedVersion;

    use super::*;

    #[test]
    fn stale_version_becomes_a_concurrency_error() {
        let err: StoreError = ExpectedVersion::Exact(1).check(2).unwrap_err().into();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }

    #[test]
    fn rejected_input_becomes_a_validation_error() {
        let err: StoreError = DomainError::validation("name cannot be empty").into();
        assert_eq!(err, StoreError::Validation("name cannot be empty".to_string()));

        let err: StoreError = "x".parse::<ProductId>().unwrap_err().into();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn stock_errors_keep_their_numbers() {
        let err: StoreError = StockError::Insufficient {
            requested: 6,
            available: 4,
        }
        .into();
        assert_eq!(
            err,
            StoreError::InsufficientStock {
                requested: 6,
                available: 4
            }
        );
        assert!(matches!(StoreError::from(StockError::ZeroAmount), StoreError::Validation(_)));
    }
}
