use std::sync::Arc;

use stockpos_core::{ExpectedVersion, ProductId};
use stockpos_products::{NewProduct, Product, ProductPatch};

use crate::error::StoreError;

/// Product catalog with per-product atomic stock updates.
///
/// ## Stock invariant
///
/// Every mutation that touches `stock` (sale decrement, catalog update) runs
/// under the product's own lock, so readers only ever observe committed,
/// non-negative stock values.
///
/// ## Versions
///
/// Stored products start at version 1 and every committed mutation bumps the
/// version by one. `update` accepts an [`ExpectedVersion`] so catalog edits can
/// be made conditional on the state the editor last saw.
pub trait ProductStore: Send + Sync {
    /// Fetch a product by id.
    fn get(&self, id: ProductId) -> Result<Product, StoreError>;

    /// All products, ordered by id.
    fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Add a product under the next free id.
    fn insert(&self, new: NewProduct) -> Result<Product, StoreError>;

    /// Apply a catalog edit.
    fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError>;

    /// Remove a product. Sales that reference it are left alone.
    fn delete(&self, id: ProductId) -> Result<(), StoreError>;

    /// Atomically lower stock by `amount` if at least `amount` units are left.
    ///
    /// On `InsufficientStock` nothing is written.
    fn decrement_stock(&self, id: ProductId, amount: u64) -> Result<Product, StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list()
    }

    fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        (**self).insert(new)
    }

    fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        (**self).update(id, patch, expected_version)
    }

    fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn decrement_stock(&self, id: ProductId, amount: u64) -> Result<Product, StoreError> {
        (**self).decrement_stock(id, amount)
    }
}
