use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockpos_core::{AggregateRoot, DomainError, DomainResult, Money, ProductId};

/// Aggregate root: Product.
///
/// `stock` is unsigned, so the "never negative" invariant is carried by the
/// type; every path that lowers it goes through [`Product::decrement_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Money,
    unit_cost: Money,
    stock: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Payload for adding a product to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub unit_cost: Money,
    #[serde(default)]
    pub stock: u64,
}

/// Partial update of a catalog entry. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    pub unit_cost: Option<Money>,
    pub stock: Option<u64>,
}

/// Stored representation of a product, used by storage backends that keep
/// products outside process memory to rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub unit_cost: Money,
    pub stock: u64,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rejected stock decrement. The product is left as it was.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StockError {
    #[error("decrement amount must be at least 1")]
    ZeroAmount,

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: u64, available: u64 },
}

impl Product {
    /// Build the first version of a product under a store-assigned id.
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_name(&new.name)?;
        Ok(Self {
            id,
            name,
            description: normalize_description(new.description),
            price: new.price,
            unit_cost: new.unit_cost,
            stock: new.stock,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn unit_cost(&self) -> Money {
        self.unit_cost
    }

    pub fn stock(&self) -> u64 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Decide the state after selling `amount` units.
    ///
    /// Pure: `self` is not touched, the caller commits the returned value.
    pub fn decrement_stock(&self, amount: u64, now: DateTime<Utc>) -> Result<Self, StockError> {
        if amount == 0 {
            return Err(StockError::ZeroAmount);
        }
        let stock = self.stock.checked_sub(amount).ok_or(StockError::Insufficient {
            requested: amount,
            available: self.stock,
        })?;

        let mut next = self.clone();
        next.stock = stock;
        next.touch(now);
        Ok(next)
    }

    /// Decide the state after a catalog edit.
    pub fn apply_patch(&self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = validate_name(&name)?;
        }
        if let Some(description) = patch.description {
            next.description = normalize_description(description);
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(unit_cost) = patch.unit_cost {
            next.unit_cost = unit_cost;
        }
        if let Some(stock) = patch.stock {
            next.stock = stock;
        }
        next.touch(now);
        Ok(next)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            price: record.price,
            unit_cost: record.unit_cost,
            stock: record.stock,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
