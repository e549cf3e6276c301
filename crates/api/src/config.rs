//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STOCKPOS_MAX_SALE_ATTEMPTS` | `5` | attempts per sale before giving up (>= 1) |
//! | `STOCKPOS_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `STOCKPOS_SEED_DEMO` | `true` | seed the demo catalog into an empty store |
//! | `STOCKPOS_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres connection string; in-memory stores when unset |

use std::net::SocketAddr;

use thiserror::Error;

use stockpos_infra::DEFAULT_MAX_ATTEMPTS;
use stockpos_observability::LogFormat;

pub const MAX_SALE_ATTEMPTS_VAR: &str = "STOCKPOS_MAX_SALE_ATTEMPTS";
pub const LOG_FORMAT_VAR: &str = "STOCKPOS_LOG_FORMAT";
pub const SEED_DEMO_VAR: &str = "STOCKPOS_SEED_DEMO";
pub const BIND_ADDR_VAR: &str = "STOCKPOS_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub max_sale_attempts: u32,
    pub log_format: LogFormat,
    pub seed_demo: bool,
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_sale_attempts: DEFAULT_MAX_ATTEMPTS,
            log_format: LogFormat::default(),
            seed_demo: true,
            bind_addr: DEFAULT_BIND_ADDR,
            database_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Unset and empty keys take
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let max_sale_attempts = match get(MAX_SALE_ATTEMPTS_VAR) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ConfigError::Invalid {
                    key: MAX_SALE_ATTEMPTS_VAR,
                    expected: "a positive integer",
                    value: raw,
                })?,
            None => defaults.max_sale_attempts,
        };

        let log_format = match get(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse::<LogFormat>().map_err(|_| ConfigError::Invalid {
                key: LOG_FORMAT_VAR,
                expected: "'json' or 'pretty'",
                value: raw.clone(),
            })?,
            None => defaults.log_format,
        };

        let seed_demo = match get(SEED_DEMO_VAR) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: SEED_DEMO_VAR,
                expected: "a boolean",
                value: raw,
            })?,
            None => defaults.seed_demo,
        };

        let bind_addr = match get(BIND_ADDR_VAR) {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: BIND_ADDR_VAR,
                expected: "a socket address like 0.0.0.0:8080",
                value: raw.clone(),
            })?,
            None => defaults.bind_addr,
        };

        Ok(Self {
            max_sale_attempts,
            log_format,
            seed_demo,
            bind_addr,
            database_url: get(DATABASE_URL_VAR),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
