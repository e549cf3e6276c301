use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpos_core::ProductId;

use crate::sale::Sale;

/// Ledger read filter. All bounds are inclusive; `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub product_id: Option<ProductId>,
}

impl SaleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            product_id: None,
        }
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn for_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn matches(&self, sale: &Sale) -> bool {
        let at = sale.occurred_at();
        self.start.is_none_or(|start| at >= start)
            && self.end.is_none_or(|end| at <= end)
            && self.product_id.is_none_or(|id| sale.product_id() == id)
    }
}
