use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use stockpos_core::{AggregateRoot, ExpectedVersion, ProductId};
use stockpos_products::{NewProduct, Product, ProductPatch};

use super::r#trait::ProductStore;
use crate::error::StoreError;

/// One product's lockable cell. `None` once the product has been deleted, so a
/// writer that fetched the slot before the delete still sees it gone.
type Slot = Arc<Mutex<Option<Product>>>;

#[derive(Debug, Default)]
struct Catalog {
    slots: BTreeMap<ProductId, Slot>,
    last_id: i64,
}

/// In-memory product catalog.
///
/// The catalog map is only locked long enough to find (or add/remove) a slot;
/// all reads and writes of a product happen under that product's own mutex.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to one product's slot.
    ///
    /// The slot lock is released when `f` returns, on success and error alike.
    pub(crate) fn with_slot<R>(
        &self,
        id: ProductId,
        f: impl FnOnce(&mut Option<Product>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let slot = {
            let catalog = self.catalog.read().map_err(|_| StoreError::poisoned())?;
            catalog
                .slots
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(id))?
        };

        let mut guard = slot.lock().map_err(|_| StoreError::poisoned())?;
        f(&mut guard)
    }
}

impl ProductStore for InMemoryProductStore {
    fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        self.with_slot(id, |slot| slot.clone().ok_or(StoreError::NotFound(id)))
    }

    fn list(&self) -> Result<Vec<Product>, StoreError> {
        let slots: Vec<Slot> = {
            let catalog = self.catalog.read().map_err(|_| StoreError::poisoned())?;
            catalog.slots.values().cloned().collect()
        };

        let mut products = Vec::with_capacity(slots.len());
        for slot in slots {
            let guard = slot.lock().map_err(|_| StoreError::poisoned())?;
            if let Some(product) = guard.as_ref() {
                products.push(product.clone());
            }
        }
        Ok(products)
    }

    fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut catalog = self.catalog.write().map_err(|_| StoreError::poisoned())?;
        let id = ProductId::new(catalog.last_id + 1);
        let product = Product::create(id, new, Utc::now())?;

        catalog.last_id = id.get();
        catalog
            .slots
            .insert(id, Arc::new(Mutex::new(Some(product.clone()))));
        Ok(product)
    }

    fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        self.with_slot(id, |slot| {
            let current = slot.as_mut().ok_or(StoreError::NotFound(id))?;
            expected_version.check(current.version())?;

            let next = current.apply_patch(patch, Utc::now())?;
            *current = next.clone();
            Ok(next)
        })
    }

    fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        self.with_slot(id, |slot| {
            slot.take().map(|_| ()).ok_or(StoreError::NotFound(id))
        })?;

        let mut catalog = self.catalog.write().map_err(|_| StoreError::poisoned())?;
        catalog.slots.remove(&id);
        Ok(())
    }

    fn decrement_stock(&self, id: ProductId, amount: u64) -> Result<Product, StoreError> {
        self.with_slot(id, |slot| {
            let current = slot.as_mut().ok_or(StoreError::NotFound(id))?;
            let next = current.decrement_stock(amount, Utc::now())?;
            *current = next.clone();
            Ok(next)
        })
    }
}
