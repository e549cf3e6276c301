//! Demo catalog used by development setups.

use tracing::info;

use stockpos_core::Money;
use stockpos_products::{NewProduct, Product};

use crate::error::StoreError;
use crate::product_store::ProductStore;

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Gaseosa Cola 500ml".to_string(),
            description: Some("Bebida gaseosa sabor cola".to_string()),
            price: Money::from_cents(250),
            unit_cost: Money::from_cents(120),
            stock: 34,
        },
        NewProduct {
            name: "Arroz 1kg".to_string(),
            description: Some("Arroz blanco grano largo".to_string()),
            price: Money::from_cents(400),
            unit_cost: Money::from_cents(250),
            stock: 12,
        },
        NewProduct {
            name: "Aceite 1L".to_string(),
            description: Some("Aceite vegetal".to_string()),
            price: Money::from_cents(750),
            unit_cost: Money::from_cents(500),
            stock: 6,
        },
    ]
}

/// Insert the demo products if the catalog is empty.
///
/// Returns the inserted products; an already populated catalog is left alone
/// and yields an empty vec.
pub fn seed_demo_catalog<S>(store: &S) -> Result<Vec<Product>, StoreError>
where
    S: ProductStore + ?Sized,
{
    if !store.list()?.is_empty() {
        return Ok(Vec::new());
    }

    let inserted = demo_products()
        .into_iter()
        .map(|p| store.insert(p))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = inserted.len(), "seeded demo catalog");
    Ok(inserted)
}
