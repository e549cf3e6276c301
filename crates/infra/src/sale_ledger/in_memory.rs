use std::sync::RwLock;

use stockpos_core::SaleId;
use stockpos_sales::{NewSale, Sale, SaleFilter};

use super::r#trait::SaleLedger;
use crate::error::StoreError;

/// In-memory append-only ledger. Sale `n` lives at index `n - 1`.
#[derive(Debug, Default)]
pub struct InMemorySaleLedger {
    sales: RwLock<Vec<Sale>>,
}

impl InMemorySaleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let sales = self.sales.read().map_err(|_| StoreError::poisoned())?;
        Ok(sales.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl SaleLedger for InMemorySaleLedger {
    fn append(&self, sale: NewSale) -> Result<Sale, StoreError> {
        if sale.quantity == 0 {
            return Err(StoreError::Validation("sale quantity must be at least 1".to_string()));
        }

        let mut sales = self.sales.write().map_err(|_| StoreError::poisoned())?;
        let id = SaleId::new(sales.len() as i64 + 1);
        let recorded = sale.into_sale(id);
        sales.push(recorded.clone());
        Ok(recorded)
    }

    fn get(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        let sales = self.sales.read().map_err(|_| StoreError::poisoned())?;
        let index = id
            .get()
            .checked_sub(1)
            .and_then(|n| usize::try_from(n).ok());
        Ok(index.and_then(|i| sales.get(i)).cloned())
    }

    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        let sales = self.sales.read().map_err(|_| StoreError::poisoned())?;
        Ok(sales.iter().filter(|s| filter.matches(s)).cloned().collect())
    }
}
