//! Postgres-backed catalog, ledger and sale storage.
//!
//! `PostgresSaleStore` implements the same [`ProductStore`], [`SaleLedger`]
//! and [`SaleStorage`] traits as the in-memory stores, so
//! [`crate::SaleTransaction`] drives it with the same load / capture / commit
//! cycle and the same retry loop. The product row lock is held by the
//! database instead of a process mutex.
//!
//! ## Commit Shape
//!
//! ```text
//! BEGIN
//!   SELECT ... FROM products WHERE id = $1 FOR UPDATE   -- row lock
//!   (settle in Rust: version check, snapshot check, stock decrement)
//!   UPDATE products SET stock, version ... WHERE id AND version
//!   INSERT INTO sales ... RETURNING id
//! COMMIT
//! ```
//!
//! Any early return drops the `sqlx::Transaction`, which rolls it back.
//!
//! ## Sync Traits, Async Driver
//!
//! The store traits are synchronous and sqlx is async. Trait calls run the
//! async query on the ambient tokio runtime through `block_in_place`, which
//! needs the multi-threaded runtime (axum under `#[tokio::main]`,
//! `spawn_blocking`, or `#[tokio::test(flavor = "multi_thread")]`). Anywhere
//! else the call fails with `StoreError::Unavailable` instead of panicking.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database | `40001` | `Concurrency` | Serialization failure |
//! | Database | `40P01` | `Concurrency` | Deadlock detected |
//! | Database | `23514` | `Validation` | Check constraint (negative stock, zero quantity) |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | PoolClosed / Io / other | N/A | `Unavailable` | Connection failures |

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, instrument};

use stockpos_core::{AggregateRoot, ExpectedVersion, Money, ProductId, SaleId};
use stockpos_products::{NewProduct, Product, ProductPatch, ProductRecord};
use stockpos_sales::{NewSale, Sale, SaleFilter};

use crate::error::StoreError;
use crate::product_store::ProductStore;
use crate::sale_ledger::SaleLedger;
use crate::storage::{SaleStorage, settle_sale};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id              BIGSERIAL PRIMARY KEY,
        name            TEXT        NOT NULL,
        description     TEXT,
        price_cents     BIGINT      NOT NULL CHECK (price_cents >= 0),
        unit_cost_cents BIGINT      NOT NULL CHECK (unit_cost_cents >= 0),
        stock           BIGINT      NOT NULL CHECK (stock >= 0),
        version         BIGINT      NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id               BIGSERIAL PRIMARY KEY,
        product_id       BIGINT      NOT NULL,
        product_name     TEXT        NOT NULL,
        quantity         BIGINT      NOT NULL CHECK (quantity >= 1),
        unit_price_cents BIGINT      NOT NULL,
        total_cents      BIGINT      NOT NULL,
        unit_cost_cents  BIGINT      NOT NULL,
        total_cost_cents BIGINT      NOT NULL,
        occurred_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sales_occurred_at_idx ON sales (occurred_at)",
    "CREATE INDEX IF NOT EXISTS sales_product_id_idx ON sales (product_id)",
];

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, unit_cost_cents, stock, version, created_at, updated_at";

const SALE_COLUMNS: &str = "id, product_id, product_name, quantity, unit_price_cents, total_cents, \
     unit_cost_cents, total_cost_cents, occurred_at";

/// Product catalog and sale ledger in PostgreSQL.
///
/// `PostgresSaleStore` is `Send + Sync` and cheap to clone; all clones share
/// one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresSaleStore {
    pool: PgPool,
}

impl PostgresSaleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        info!("postgres schema ready");
        Ok(())
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        // Validate before touching the database; the id is a placeholder.
        let draft = Product::create(ProductId::new(0), new, now)?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price_cents, unit_cost_cents, stock, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(draft.name())
        .bind(draft.description())
        .bind(to_db(draft.price().cents(), "price_cents")?)
        .bind(to_db(draft.unit_cost().cents(), "unit_cost_cents")?)
        .bind(to_db(draft.stock(), "stock")?)
        .bind(to_db(draft.version(), "version")?)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_product", e))?;

        Ok(Product::from(ProductRecord {
            id: ProductId::new(id),
            name: draft.name().to_string(),
            description: draft.description().map(str::to_string),
            price: draft.price(),
            unit_cost: draft.unit_cost(),
            stock: draft.stock(),
            version: draft.version(),
            created_at: now,
            updated_at: now,
        }))
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .ok_or(StoreError::NotFound(id))?;
        product_from_row(&row)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        let mut tx = self.begin().await?;
        let current = lock_product(&mut tx, id).await?;
        expected_version.check(current.version())?;

        let next = current.apply_patch(patch, Utc::now())?;
        write_product(&mut tx, &current, &next).await?;
        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub async fn decrement_product_stock(
        &self,
        id: ProductId,
        amount: u64,
    ) -> Result<Product, StoreError> {
        let mut tx = self.begin().await?;
        let current = lock_product(&mut tx, id).await?;
        let next = current.decrement_stock(amount, Utc::now())?;
        write_product(&mut tx, &current, &next).await?;
        commit(tx).await?;
        Ok(next)
    }

    /// Append a sale without touching stock.
    pub async fn append_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        if sale.quantity == 0 {
            return Err(StoreError::Validation("sale quantity must be at least 1".to_string()));
        }
        let mut tx = self.begin().await?;
        let recorded = insert_sale(&mut tx, sale).await?;
        commit(tx).await?;
        Ok(recorded)
    }

    pub async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sale", e))?;
        row.as_ref().map(sale_from_row).transpose()
    }

    /// Sales matching `filter`, in ledger order.
    pub async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
              AND ($2::timestamptz IS NULL OR occurred_at <= $2)
              AND ($3::bigint IS NULL OR product_id = $3)
            ORDER BY id ASC
            "#
        ))
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.product_id.map(ProductId::get))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales", e))?;

        rows.iter().map(sale_from_row).collect()
    }

    /// Decrement stock and record `sale` in one database transaction.
    #[instrument(skip(self, sale), err)]
    pub async fn commit_sale_async(
        &self,
        product_id: ProductId,
        expected_version: ExpectedVersion,
        sale: NewSale,
    ) -> Result<Sale, StoreError> {
        let mut tx = self.begin().await?;
        let current = lock_product(&mut tx, product_id).await?;
        let next = settle_sale(&current, expected_version, &sale)?;

        write_product(&mut tx, &current, &next).await?;
        let recorded = insert_sale(&mut tx, sale).await?;
        commit(tx).await?;
        Ok(recorded)
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

impl ProductStore for PostgresSaleStore {
    fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        block_on(self.get_product(id))?
    }

    fn list(&self) -> Result<Vec<Product>, StoreError> {
        block_on(self.list_products())?
    }

    fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        block_on(self.insert_product(new))?
    }

    fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected_version: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        block_on(self.update_product(id, patch, expected_version))?
    }

    fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        block_on(self.delete_product(id))?
    }

    fn decrement_stock(&self, id: ProductId, amount: u64) -> Result<Product, StoreError> {
        block_on(self.decrement_product_stock(id, amount))?
    }
}

impl SaleLedger for PostgresSaleStore {
    fn append(&self, sale: NewSale) -> Result<Sale, StoreError> {
        block_on(self.append_sale(sale))?
    }

    fn get(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        block_on(self.get_sale(id))?
    }

    fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, StoreError> {
        block_on(self.list_sales(filter))?
    }
}

impl SaleStorage for PostgresSaleStore {
    fn load_product(&self, id: ProductId) -> Result<Product, StoreError> {
        block_on(self.get_product(id))?
    }

    fn commit_sale(
        &self,
        product_id: ProductId,
        expected_version: ExpectedVersion,
        sale: NewSale,
    ) -> Result<Sale, StoreError> {
        block_on(self.commit_sale_async(product_id, expected_version, sale))?
    }
}

/// Run `fut` to completion on the ambient multi-threaded tokio runtime.
fn block_on<F: Future>(fut: F) -> Result<F::Output, StoreError> {
    let handle = Handle::try_current().map_err(|_| {
        StoreError::Unavailable("PostgresSaleStore must be called inside a tokio runtime".to_string())
    })?;
    if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
        return Err(StoreError::Unavailable(
            "PostgresSaleStore needs the multi-threaded tokio runtime".to_string(),
        ));
    }
    Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<Product, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.get())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_product", e))?
    .ok_or(StoreError::NotFound(id))?;
    product_from_row(&row)
}

/// Overwrite the locked row `current` with `next`.
async fn write_product(
    tx: &mut Transaction<'_, Postgres>,
    current: &Product,
    next: &Product,
) -> Result<(), StoreError> {
    let id = current.id_typed();
    let result = sqlx::query(
        r#"
        UPDATE products
        SET name = $1, description = $2, price_cents = $3, unit_cost_cents = $4,
            stock = $5, version = $6, updated_at = $7
        WHERE id = $8 AND version = $9
        "#,
    )
    .bind(next.name())
    .bind(next.description())
    .bind(to_db(next.price().cents(), "price_cents")?)
    .bind(to_db(next.unit_cost().cents(), "unit_cost_cents")?)
    .bind(to_db(next.stock(), "stock")?)
    .bind(to_db(next.version(), "version")?)
    .bind(next.updated_at())
    .bind(id.get())
    .bind(to_db(current.version(), "version")?)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_product", e))?;

    // The row is locked, so this only trips if the lock was somehow lost.
    if result.rows_affected() != 1 {
        return Err(StoreError::Concurrency(format!(
            "product {id} changed under the row lock"
        )));
    }
    Ok(())
}

async fn insert_sale(tx: &mut Transaction<'_, Postgres>, sale: NewSale) -> Result<Sale, StoreError> {
    let row = sqlx::query(
        r#"
        INSERT INTO sales (product_id, product_name, quantity, unit_price_cents, total_cents,
                           unit_cost_cents, total_cost_cents, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(sale.product_id.get())
    .bind(&sale.product_name)
    .bind(to_db(sale.quantity, "quantity")?)
    .bind(to_db(sale.unit_price.cents(), "unit_price_cents")?)
    .bind(to_db(sale.total.cents(), "total_cents")?)
    .bind(to_db(sale.unit_cost.cents(), "unit_cost_cents")?)
    .bind(to_db(sale.total_cost.cents(), "total_cost_cents")?)
    .bind(sale.occurred_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_sale", e))?;

    let id: i64 = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("insert_sale", e))?;
    Ok(sale.into_sale(SaleId::new(id)))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let get_err = |e: sqlx::Error| map_sqlx_error("read_product", e);
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    Ok(Product::from(ProductRecord {
        id: ProductId::new(row.try_get("id").map_err(get_err)?),
        name: row.try_get("name").map_err(get_err)?,
        description: row.try_get("description").map_err(get_err)?,
        price: money_column(row, "price_cents")?,
        unit_cost: money_column(row, "unit_cost_cents")?,
        stock: from_db(row.try_get("stock").map_err(get_err)?, "stock")?,
        version: from_db(row.try_get("version").map_err(get_err)?, "version")?,
        created_at,
        updated_at,
    }))
}

fn sale_from_row(row: &PgRow) -> Result<Sale, StoreError> {
    let get_err = |e: sqlx::Error| map_sqlx_error("read_sale", e);
    let id: i64 = row.try_get("id").map_err(get_err)?;

    Ok(NewSale {
        product_id: ProductId::new(row.try_get("product_id").map_err(get_err)?),
        product_name: row.try_get("product_name").map_err(get_err)?,
        quantity: from_db(row.try_get("quantity").map_err(get_err)?, "quantity")?,
        unit_price: money_column(row, "unit_price_cents")?,
        total: money_column(row, "total_cents")?,
        unit_cost: money_column(row, "unit_cost_cents")?,
        total_cost: money_column(row, "total_cost_cents")?,
        occurred_at: row.try_get("occurred_at").map_err(get_err)?,
    }
    .into_sale(SaleId::new(id)))
}

fn money_column(row: &PgRow, column: &str) -> Result<Money, StoreError> {
    let cents: i64 = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("read_money", e))?;
    Ok(Money::from_cents(from_db(cents, column)?))
}

/// Postgres has no unsigned integers; counts and cents are stored as BIGINT.
fn to_db(value: u64, column: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Validation(format!("{column} value {value} exceeds BIGINT range")))
}

fn from_db(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::Unavailable(format!("{column} holds negative value {value}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some(code) => classify_sqlstate(code, msg),
                None => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn classify_sqlstate(code: &str, msg: String) -> StoreError {
    match code {
        // serialization_failure, deadlock_detected
        "40001" | "40P01" => StoreError::Concurrency(msg),
        // check_violation
        "23514" => StoreError::Validation(msg),
        _ => StoreError::Unavailable(msg),
    }
}
