//! Application wiring and HTTP mapping.
//!
//! This folder is structured like:
//! - `services.rs`: store and sale-transaction wiring
//! - `routes/`: axum handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use stockpos_infra::StoreError;

use crate::config::AppConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Backend};

/// Full router over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .fallback(routes::system::not_found)
        .layer(Extension(services))
}

/// Build the application from config (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StoreError> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}
