//! Transactional storage boundary for sale creation.
//!
//! A sale touches two stores: the product's stock and the ledger. This module
//! defines the unit of work that commits both together, plus the in-memory
//! implementation built on [`InMemoryProductStore`] and [`InMemorySaleLedger`].

use std::sync::Arc;

use stockpos_core::{AggregateRoot, ExpectedVersion, ProductId};
use stockpos_products::Product;
use stockpos_sales::{NewSale, Sale};

use crate::error::StoreError;
use crate::product_store::{InMemoryProductStore, ProductStore};
use crate::sale_ledger::{InMemorySaleLedger, SaleLedger};

/// Storage handle that can commit "decrement stock + record sale" atomically.
///
/// ## Commit Semantics
///
/// `commit_sale()`:
/// - takes exclusive access to `product_id`
/// - checks the stored product is still at `expected_version`
///   (otherwise `StoreError::Concurrency`, nothing written)
/// - checks `sale` is a snapshot of the stored product (otherwise
///   `StoreError::Validation`)
/// - decrements the stored stock by `sale.quantity` (otherwise
///   `StoreError::InsufficientStock`) and appends `sale`, both or neither
///
/// The new stock is always computed by the storage from the locked row, so a
/// caller cannot record a sale without paying for it in stock. Exclusive
/// access is per product, so commits for different products do not wait on
/// each other.
pub trait SaleStorage: Send + Sync {
    /// Read the product a sale will be decided on.
    fn load_product(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Commit a captured sale against the product version it was captured from.
    fn commit_sale(
        &self,
        product_id: ProductId,
        expected_version: ExpectedVersion,
        sale: NewSale,
    ) -> Result<Sale, StoreError>;
}

impl<S> SaleStorage for Arc<S>
where
    S: SaleStorage + ?Sized,
{
    fn load_product(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).load_product(id)
    }

    fn commit_sale(
        &self,
        product_id: ProductId,
        expected_version: ExpectedVersion,
        sale: NewSale,
    ) -> Result<Sale, StoreError> {
        (**self).commit_sale(product_id, expected_version, sale)
    }
}

/// Decide the product state after `sale`, given the locked `current` state.
///
/// Shared by every [`SaleStorage`] so the checks cannot drift apart.
pub(crate) fn settle_sale(
    current: &Product,
    expected_version: ExpectedVersion,
    sale: &NewSale,
) -> Result<Product, StoreError> {
    let id = current.id_typed();
    if !expected_version.matches(current.version()) {
        return Err(StoreError::Concurrency(format!(
            "product {id}: expected {expected_version:?}, found {}",
            current.version()
        )));
    }
    if !sale.is_snapshot_of(current) {
        return Err(StoreError::Validation(format!(
            "sale does not match the current state of product {id}"
        )));
    }
    Ok(current.decrement_stock(sale.quantity, sale.occurred_at)?)
}

/// In-memory unit of work over a shared product store and ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleStorage {
    products: Arc<InMemoryProductStore>,
    ledger: Arc<InMemorySaleLedger>,
}

impl InMemorySaleStorage {
    pub fn new(products: Arc<InMemoryProductStore>, ledger: Arc<InMemorySaleLedger>) -> Self {
        Self { products, ledger }
    }

    pub fn products(&self) -> &Arc<InMemoryProductStore> {
        &self.products
    }

    pub fn ledger(&self) -> &Arc<InMemorySaleLedger> {
        &self.ledger
    }
}

impl SaleStorage for InMemorySaleStorage {
    fn load_product(&self, id: ProductId) -> Result<Product, StoreError> {
        self.products.get(id)
    }

    fn commit_sale(
        &self,
        product_id: ProductId,
        expected_version: ExpectedVersion,
        sale: NewSale,
    ) -> Result<Sale, StoreError> {
        // Lock order is always product slot -> ledger, never the reverse.
        self.products.with_slot(product_id, |slot| {
            let current = slot.as_mut().ok_or(StoreError::NotFound(product_id))?;
            let next = settle_sale(current, expected_version, &sale)?;

            // Ledger first: if the append fails the product is untouched.
            let recorded = self.ledger.append(sale)?;
            *current = next;
            Ok(recorded)
        })
    }
}
