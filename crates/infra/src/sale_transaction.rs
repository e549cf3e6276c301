//! Sale creation pipeline (application-level orchestration).
//!
//! ## Execution Flow
//!
//! ```text
//! create_sale(product_id, quantity)
//!   ↓
//! 0. Validate quantity (no storage access)
//!   ↓
//! 1. Load product
//!   ↓
//! 2. Capture sale: name / price / cost snapshot + timestamp
//!   ↓
//! 3. Commit under the product lock, expecting the loaded version:
//!    stock check + decrement + ledger append as one unit
//!   ↓   └─ version moved on → reload and capture again (bounded)
//! 4. Return the recorded sale
//! ```
//!
//! Steps 1–3 run against whatever [`SaleStorage`] is plugged in (in-memory or
//! Postgres); this module contains no locking or IO itself, and it is the only
//! retry loop for sales.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use stockpos_core::{AggregateRoot, ExpectedVersion, ProductId};
use stockpos_sales::{NewSale, Sale, SaleError, SaleQuantity};

use crate::error::StoreError;
use crate::storage::SaleStorage;

/// Attempts per sale (first try plus retries) unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Outcome of one attempt at a sale.
#[derive(Debug)]
enum AttemptError {
    /// Someone else committed to the product first; decide again.
    Conflict(String),
    /// Final answer for the caller.
    Rejected(SaleError),
}

impl AttemptError {
    fn from_store(err: StoreError, product_id: ProductId) -> Self {
        match err {
            StoreError::Concurrency(msg) => AttemptError::Conflict(msg),
            StoreError::NotFound(_) => AttemptError::Rejected(SaleError::ProductNotFound(product_id)),
            StoreError::InsufficientStock {
                requested,
                available,
            } => AttemptError::Rejected(SaleError::InsufficientStock {
                requested,
                available,
            }),
            StoreError::Validation(msg) | StoreError::Unavailable(msg) => {
                AttemptError::Rejected(SaleError::Unavailable(msg))
            }
        }
    }
}

impl From<SaleError> for AttemptError {
    fn from(value: SaleError) -> Self {
        AttemptError::Rejected(value)
    }
}

/// The one write operation of the point of sale: sell units of a product.
///
/// ## Guarantees
///
/// - **Validation first**: a quantity below 1 fails with `InvalidQuantity`
///   before storage is touched
/// - **All or nothing**: stock decrement and ledger append commit together
/// - **Serializable per product**: every commit expects the product version it
///   was decided on, so two sales can never both spend the same units
/// - **Bounded retries**: a lost race is retried up to `max_attempts` times in
///   total, then reported as `SaleError::Unavailable`
///
/// ## Generic Parameters
///
/// - `S`: storage implementation (in-memory for tests/dev, database-backed in
///   production)
#[derive(Debug, Clone)]
pub struct SaleTransaction<S> {
    storage: S,
    max_attempts: u32,
}

impl<S> SaleTransaction<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Total attempts per sale, including the first. Values below 1 mean 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S> SaleTransaction<S>
where
    S: SaleStorage,
{
    /// Sell `quantity` units of `product_id`.
    #[instrument(skip(self))]
    pub fn create_sale(&self, product_id: ProductId, quantity: i64) -> Result<Sale, SaleError> {
        let quantity = SaleQuantity::new(quantity)?;

        for attempt in 1..=self.max_attempts {
            match self.attempt(product_id, quantity) {
                Ok(sale) => {
                    info!(
                        sale_id = %sale.id_typed(),
                        quantity = sale.quantity(),
                        total = %sale.total(),
                        attempt,
                        "sale recorded"
                    );
                    return Ok(sale);
                }
                Err(AttemptError::Conflict(msg)) => {
                    debug!(attempt, reason = %msg, "sale lost a concurrent update, retrying");
                    std::thread::yield_now();
                }
                Err(AttemptError::Rejected(err)) => {
                    if err.is_client_error() {
                        debug!(error = %err, "sale rejected");
                    } else {
                        warn!(error = %err, "sale failed");
                    }
                    return Err(err);
                }
            }
        }

        warn!(attempts = self.max_attempts, "sale gave up after repeated conflicts");
        Err(SaleError::unavailable(format!(
            "product {product_id} is busy; gave up after {} attempts",
            self.max_attempts
        )))
    }

    fn attempt(&self, product_id: ProductId, quantity: SaleQuantity) -> Result<Sale, AttemptError> {
        let product = self
            .storage
            .load_product(product_id)
            .map_err(|e| AttemptError::from_store(e, product_id))?;

        let sale = NewSale::capture(&product, quantity, Utc::now())?;

        self.storage
            .commit_sale(product_id, ExpectedVersion::Exact(product.version()), sale)
            .map_err(|e| AttemptError::from_store(e, product_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use stockpos_core::{ExpectedVersion, Money};
    use stockpos_products::{NewProduct, Product, ProductPatch};
    use stockpos_sales::SaleFilter;

    use super::*;
    use crate::product_store::ProductStore;
    use crate::sale_ledger::SaleLedger;
    use crate::storage::InMemorySaleStorage;

    fn setup(stock: u64, price_cents: u64) -> (SaleTransaction<InMemorySaleStorage>, ProductId) {
        let storage = InMemorySaleStorage::default();
        let product = storage
            .products()
            .insert(NewProduct {
                name: "Gaseosa Cola 500ml".to_string(),
                description: None,
                price: Money::from_cents(price_cents),
                unit_cost: Money::from_cents(120),
                stock,
            })
            .unwrap();
        (SaleTransaction::new(storage), product.id_typed())
    }

    fn stock_of(tx: &SaleTransaction<InMemorySaleStorage>, id: ProductId) -> u64 {
        tx.storage().products().get(id).unwrap().stock()
    }

    fn ledger_len(tx: &SaleTransaction<InMemorySaleStorage>) -> usize {
        tx.storage().ledger().len().unwrap()
    }

    #[test]
    fn sale_within_stock_decrements_and_records() {
        let (tx, id) = setup(5, 1000);

        let sale = tx.create_sale(id, 3).unwrap();

        assert_eq!(sale.product_id(), id);
        assert_eq!(sale.quantity(), 3);
        assert_eq!(sale.unit_price(), Money::from_cents(1000));
        assert_eq!(sale.total(), Money::from_cents(3000));
        assert_eq!(sale.total_cost(), Money::from_cents(360));
        assert_eq!(stock_of(&tx, id), 2);
        assert_eq!(ledger_len(&tx), 1);
    }

    #[test]
    fn second_sale_beyond_remaining_stock_is_rejected() {
        let (tx, id) = setup(5, 1000);
        tx.create_sale(id, 3).unwrap();

        let err = tx.create_sale(id, 3).unwrap_err();

        assert_eq!(
            err,
            SaleError::InsufficientStock {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(stock_of(&tx, id), 2);
        assert_eq!(ledger_len(&tx), 1);
    }

    #[test]
    fn unknown_product_is_not_found_and_records_nothing() {
        let (tx, _) = setup(5, 1000);

        let err = tx.create_sale(ProductId::new(404), 1).unwrap_err();

        assert_eq!(err, SaleError::ProductNotFound(ProductId::new(404)));
        assert_eq!(ledger_len(&tx), 0);
    }

    #[test]
    fn selling_the_last_unit_leaves_zero_stock() {
        let (tx, id) = setup(3, 1000);
        tx.create_sale(id, 3).unwrap();
        assert_eq!(stock_of(&tx, id), 0);
        assert!(matches!(
            tx.create_sale(id, 1),
            Err(SaleError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn unit_price_is_a_snapshot() {
        let (tx, id) = setup(10, 1000);
        let sale = tx.create_sale(id, 2).unwrap();

        tx.storage()
            .products()
            .update(
                id,
                ProductPatch {
                    price: Some(Money::from_cents(1500)),
                    ..ProductPatch::default()
                },
                ExpectedVersion::Any,
            )
            .unwrap();

        let stored = tx
            .storage()
            .ledger()
            .get(sale.id_typed())
            .unwrap()
            .unwrap();
        assert_eq!(stored.unit_price(), Money::from_cents(1000));
        assert_eq!(stored.total(), Money::from_cents(2000));

        let later = tx.create_sale(id, 1).unwrap();
        assert_eq!(later.unit_price(), Money::from_cents(1500));
    }

    /// Storage that fails the quantity check loudly if it is ever touched.
    struct UntouchableStorage;

    impl SaleStorage for UntouchableStorage {
        fn load_product(&self, _id: ProductId) -> Result<Product, StoreError> {
            panic!("storage must not be read for an invalid quantity");
        }

        fn commit_sale(
            &self,
            _product_id: ProductId,
            _expected_version: ExpectedVersion,
            _sale: NewSale,
        ) -> Result<Sale, StoreError> {
            panic!("storage must not be written for an invalid quantity");
        }
    }

    #[test]
    fn non_positive_quantity_never_touches_storage() {
        let tx = SaleTransaction::new(UntouchableStorage);
        assert_eq!(
            tx.create_sale(ProductId::new(1), 0).unwrap_err(),
            SaleError::InvalidQuantity(0)
        );
        assert_eq!(
            tx.create_sale(ProductId::new(1), -3).unwrap_err(),
            SaleError::InvalidQuantity(-3)
        );
    }

    /// Wraps real storage and reports a conflict for the first `conflicts` commits.
    struct ConflictingStorage {
        inner: InMemorySaleStorage,
        conflicts: u32,
        commits: AtomicU32,
    }

    impl SaleStorage for ConflictingStorage {
        fn load_product(&self, id: ProductId) -> Result<Product, StoreError> {
            self.inner.load_product(id)
        }

        fn commit_sale(
            &self,
            product_id: ProductId,
            expected_version: ExpectedVersion,
            sale: NewSale,
        ) -> Result<Sale, StoreError> {
            let n = self.commits.fetch_add(1, Ordering::SeqCst);
            if n < self.conflicts {
                return Err(StoreError::Concurrency("simulated".to_string()));
            }
            self.inner.commit_sale(product_id, expected_version, sale)
        }
    }

    fn conflicting(conflicts: u32) -> (Arc<ConflictingStorage>, ProductId) {
        let (tx, id) = setup(10, 250);
        let storage = Arc::new(ConflictingStorage {
            inner: tx.storage().clone(),
            conflicts,
            commits: AtomicU32::new(0),
        });
        (storage, id)
    }

    #[test]
    fn conflicts_are_retried_transparently() {
        let (storage, id) = conflicting(2);
        let tx = SaleTransaction::new(storage.clone()).with_max_attempts(3);

        let sale = tx.create_sale(id, 4).unwrap();

        assert_eq!(sale.quantity(), 4);
        assert_eq!(storage.commits.load(Ordering::SeqCst), 3);
        assert_eq!(storage.inner.products().get(id).unwrap().stock(), 6);
    }

    #[test]
    fn exhausted_retries_surface_as_unavailable() {
        let (storage, id) = conflicting(u32::MAX);
        let tx = SaleTransaction::new(storage.clone()).with_max_attempts(4);

        let err = tx.create_sale(id, 1).unwrap_err();

        assert!(matches!(err, SaleError::Unavailable(_)));
        assert_eq!(storage.commits.load(Ordering::SeqCst), 4);
        assert_eq!(storage.inner.products().get(id).unwrap().stock(), 10);
        assert!(storage.inner.ledger().list(&SaleFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let (tx, _) = setup(1, 100);
        assert_eq!(tx.with_max_attempts(0).max_attempts(), 1);
    }
}
