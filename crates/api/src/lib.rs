//! Point-of-sale HTTP API: configuration, service wiring, and axum routes.

pub mod app;
pub mod config;

pub use app::{AppServices, Backend, build_app, router};
pub use config::{AppConfig, ConfigError};
