use std::sync::Arc;

use stockpos_core::SaleId;
use stockpos_sales::{NewSale, Sale, SaleFilter};

use crate::error::StoreError;

/// Append-only store of sale records.
///
/// ## Append Semantics
///
/// `append()`:
/// - assigns the next sale id (1, 2, 3, ...)
/// - makes the record visible to readers immediately
/// - keeps records in append order, which is the order their stock
///   decrements were committed in
///
/// There is no update or delete: a written sale is history.
pub trait SaleLedger: Send + Sync {
    /// Store a fully-formed sale and return it with its id.
    fn append(&self, sale: NewSale) -> Result<Sale, StoreError>;

    fn get(&self, id: SaleId) -> Result<Option<Sale>, StoreError>;

    /// Sales matching `filter`, in append order.
    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError>;
}

impl<S> SaleLedger for Arc<S>
where
    S: SaleLedger + ?Sized,
{
    fn append(&self, sale: NewSale) -> Result<Sale, StoreError> {
        (**self).append(sale)
    }

    fn get(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        (**self).get(id)
    }

    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        (**self).list(filter)
    }
}
