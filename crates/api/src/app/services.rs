use std::sync::Arc;

use tracing::info;

use stockpos_infra::{
    InMemorySaleStorage, PostgresSaleStore, ProductStore, SaleLedger, SaleStorage,
    SaleTransaction, StoreError, seed_demo_catalog,
};

use crate::config::AppConfig;

/// Which store the services run on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Postgres,
}

/// Everything the route handlers need, built once at startup.
///
/// Catalog, ledger and sale storage are three views of one backend.
#[derive(Clone)]
pub struct AppServices {
    pub backend: Backend,
    pub products: Arc<dyn ProductStore>,
    pub ledger: Arc<dyn SaleLedger>,
    pub sales: SaleTransaction<Arc<dyn SaleStorage>>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("backend", &self.backend)
            .field("max_sale_attempts", &self.sales.max_attempts())
            .finish_non_exhaustive()
    }
}

impl AppServices {
    pub fn in_memory(storage: InMemorySaleStorage, max_sale_attempts: u32) -> Self {
        Self {
            backend: Backend::InMemory,
            products: storage.products().clone(),
            ledger: storage.ledger().clone(),
            sales: SaleTransaction::new(Arc::new(storage) as Arc<dyn SaleStorage>)
                .with_max_attempts(max_sale_attempts),
        }
    }

    pub fn postgres(store: PostgresSaleStore, max_sale_attempts: u32) -> Self {
        let store = Arc::new(store);
        Self {
            backend: Backend::Postgres,
            products: store.clone(),
            ledger: store.clone(),
            sales: SaleTransaction::new(store as Arc<dyn SaleStorage>)
                .with_max_attempts(max_sale_attempts),
        }
    }
}

/// Wire the stores named by `config`: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
///
/// The Postgres path must run on the multi-threaded tokio runtime (it seeds
/// through the synchronous store traits).
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let services = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresSaleStore::connect(url).await?;
            store.migrate().await?;
            AppServices::postgres(store, config.max_sale_attempts)
        }
        None => AppServices::in_memory(InMemorySaleStorage::default(), config.max_sale_attempts),
    };

    if config.seed_demo {
        seed_demo_catalog(services.products.as_ref())?;
    }

    info!(
        backend = ?services.backend,
        max_sale_attempts = config.max_sale_attempts,
        seed_demo = config.seed_demo,
        "services ready"
    );
    Ok(services)
}
