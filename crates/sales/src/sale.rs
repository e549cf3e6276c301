use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpos_core::{Entity, Money, ProductId, SaleId};
use stockpos_products::Product;

use crate::error::SaleError;

/// Validated quantity of a sale (always >= 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SaleQuantity(u64);

impl SaleQuantity {
    pub fn new(raw: i64) -> Result<Self, SaleError> {
        if raw < 1 {
            return Err(SaleError::InvalidQuantity(raw));
        }
        Ok(Self(raw as u64))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for SaleQuantity {
    type Error = SaleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A sale that has been decided but not yet written to the ledger.
///
/// Everything except the id is captured here, from the product state that
/// the stock decrement was decided on. Cost is captured next to price so
/// profit stays correct after the product's cost changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u64,
    pub unit_price: Money,
    pub total: Money,
    pub unit_cost: Money,
    pub total_cost: Money,
    pub occurred_at: DateTime<Utc>,
}

impl NewSale {
    /// Snapshot name, price and cost of `product` for a sale of `quantity` units.
    pub fn capture(
        product: &Product,
        quantity: SaleQuantity,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, SaleError> {
        let overflow = || SaleError::InvalidQuantity(i64::try_from(quantity.get()).unwrap_or(i64::MAX));
        let unit_price = product.price();
        let unit_cost = product.unit_cost();
        let total = unit_price.checked_mul(quantity.get()).ok_or_else(overflow)?;
        let total_cost = unit_cost.checked_mul(quantity.get()).ok_or_else(overflow)?;

        Ok(Self {
            product_id: product.id_typed(),
            product_name: product.name().to_string(),
            quantity: quantity.get(),
            unit_price,
            total,
            unit_cost,
            total_cost,
            occurred_at,
        })
    }

    /// True if this sale was captured from `product` as it is now.
    pub fn is_snapshot_of(&self, product: &Product) -> bool {
        self.product_id == product.id_typed()
            && self.product_name == product.name()
            && self.unit_price == product.price()
            && self.unit_cost == product.unit_cost()
            && self.unit_price.checked_mul(self.quantity) == Some(self.total)
            && self.unit_cost.checked_mul(self.quantity) == Some(self.total_cost)
    }

    /// Stamp the ledger-assigned id. Called only by ledger implementations.
    pub fn into_sale(self, id: SaleId) -> Sale {
        Sale {
            id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total: self.total,
            unit_cost: self.unit_cost,
            total_cost: self.total_cost,
            occurred_at: self.occurred_at,
        }
    }
}

/// Immutable record of a completed sale.
///
/// There are no setters: once a sale is in the ledger its price and quantity
/// stay as they were at the moment of sale, whatever happens to the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sale {
    id: SaleId,
    product_id: ProductId,
    product_name: String,
    quantity: u64,
    unit_price: Money,
    total: Money,
    unit_cost: Money,
    total_cost: Money,
    occurred_at: DateTime<Utc>,
}

impl Sale {
    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn unit_cost(&self) -> Money {
        self.unit_cost
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }

    /// Revenue minus cost, in cents. Negative when sold below cost.
    pub fn profit_cents(&self) -> i64 {
        profit_cents(self.total, self.total_cost)
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

pub(crate) fn profit_cents(revenue: Money, cost: Money) -> i64 {
    let diff = i128::from(revenue.cents()) - i128::from(cost.cents());
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use stockpos_products::NewProduct;

    use super::*;
    use crate::SaleFilter;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn product(price_cents: u64) -> Product {
        Product::create(
            ProductId::new(1),
            NewProduct {
                name: "Aceite 1L".to_string(),
                description: None,
                price: Money::from_cents(price_cents),
                unit_cost: Money::from_cents(500),
                stock: 6,
            },
            test_time(),
        )
        .unwrap()
    }

    fn sale_at(id: i64, product_id: i64, at: DateTime<Utc>) -> Sale {
        NewSale {
            product_id: ProductId::new(product_id),
            product_name: "x".to_string(),
            quantity: 1,
            unit_price: Money::from_cents(100),
            total: Money::from_cents(100),
            unit_cost: Money::from_cents(60),
            total_cost: Money::from_cents(60),
            occurred_at: at,
        }
        .into_sale(SaleId::new(id))
    }

    #[test]
    fn quantity_must_be_positive() {
        assert_eq!(SaleQuantity::new(0), Err(SaleError::InvalidQuantity(0)));
        assert_eq!(SaleQuantity::new(-4), Err(SaleError::InvalidQuantity(-4)));
        assert_eq!(SaleQuantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn capture_snapshots_price_cost_name_and_totals() {
        let p = product(750);
        let new_sale = NewSale::capture(&p, SaleQuantity::new(3).unwrap(), test_time()).unwrap();
        assert_eq!(new_sale.product_id, ProductId::new(1));
        assert_eq!(new_sale.product_name, "Aceite 1L");
        assert_eq!(new_sale.unit_price, Money::from_cents(750));
        assert_eq!(new_sale.total, Money::from_cents(2250));
        assert_eq!(new_sale.unit_cost, Money::from_cents(500));
        assert_eq!(new_sale.total_cost, Money::from_cents(1500));
        assert_eq!(new_sale.occurred_at, test_time());
        assert!(new_sale.is_snapshot_of(&p));
    }

    #[test]
    fn snapshot_check_spots_edited_fields() {
        let p = product(750);
        let captured = NewSale::capture(&p, SaleQuantity::new(2).unwrap(), test_time()).unwrap();

        let mut cheaper = captured.clone();
        cheaper.unit_price = Money::from_cents(700);
        assert!(!cheaper.is_snapshot_of(&p));

        let mut wrong_total = captured.clone();
        wrong_total.total = Money::from_cents(1);
        assert!(!wrong_total.is_snapshot_of(&p));

        let mut free = captured;
        free.total_cost = Money::ZERO;
        assert!(!free.is_snapshot_of(&p));
    }

    #[test]
    fn profit_can_be_negative() {
        let p = product(300);
        let sale = NewSale::capture(&p, SaleQuantity::new(2).unwrap(), test_time())
            .unwrap()
            .into_sale(SaleId::new(1));
        assert_eq!(sale.total(), Money::from_cents(600));
        assert_eq!(sale.total_cost(), Money::from_cents(1000));
        assert_eq!(sale.profit_cents(), -400);
    }

    #[test]
    fn capture_rejects_total_overflow() {
        let p = product(u64::MAX / 2);
        let err = NewSale::capture(&p, SaleQuantity::new(3).unwrap(), test_time()).unwrap_err();
        assert!(matches!(err, SaleError::InvalidQuantity(3)));
    }

    #[test]
    fn into_sale_keeps_captured_fields() {
        let p = product(1000);
        let sale = NewSale::capture(&p, SaleQuantity::new(2).unwrap(), test_time())
            .unwrap()
            .into_sale(SaleId::new(9));
        assert_eq!(*sale.id(), SaleId::new(9));
        assert_eq!(sale.quantity(), 2);
        assert_eq!(sale.total(), Money::from_cents(2000));
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let t = test_time();
        let sale = sale_at(1, 1, t);
        assert!(SaleFilter::between(t, t).matches(&sale));
        assert!(!SaleFilter::all().since(t + Duration::seconds(1)).matches(&sale));
        assert!(!SaleFilter::all().until(t - Duration::seconds(1)).matches(&sale));
        assert!(SaleFilter::all().matches(&sale));
    }

    #[test]
    fn filter_by_product() {
        let sale = sale_at(1, 2, test_time());
        assert!(SaleFilter::all().for_product(ProductId::new(2)).matches(&sale));
        assert!(!SaleFilter::all().for_product(ProductId::new(3)).matches(&sale));
    }

    #[test]
    fn only_unavailable_is_a_server_error() {
        assert!(SaleError::InvalidQuantity(0).is_client_error());
        assert!(SaleError::ProductNotFound(ProductId::new(1)).is_client_error());
        assert!(!SaleError::unavailable("db down").is_client_error());
    }
}
