//! Configuration module
//!
//! Loads configuration from environment variables. A `.env` file is
//! honoured in development.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    /// Base path the order routes are mounted under
    pub base_path: String,
    pub logger: LoggerConfig,
    pub event_store: EventStoreConfig,
    pub doc_store: DocStoreConfig,
    pub search: SearchConfig,
    pub subscriptions: SubscriptionsConfig,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Default tracing filter, overridable via RUST_LOG
    pub level: String,
    /// When set, error responses carry the underlying cause
    pub debug: bool,
    /// "json" or "console"
    pub encoder: String,
}

#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct DocStoreConfig {
    pub url: String,
    pub orders_table: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub orders_index: String,
}

#[derive(Debug, Clone)]
pub struct SubscriptionsConfig {
    /// The projector spawns pool_size + 1 workers per group
    pub pool_size: usize,
    /// Stream prefix the subscription groups filter on
    pub order_prefix: String,
    pub doc_projection_group_name: String,
    pub search_projection_group_name: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let event_store_url =
            env::var("EVENT_STORE_URL").map_err(|_| ConfigError::MissingEnv("EVENT_STORE_URL"))?;

        let config = Self {
            service_name: var_or("SERVICE_NAME", "orderflow"),
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 5000)?,
            base_path: var_or("BASE_PATH", "/api/orders"),
            logger: LoggerConfig {
                level: var_or("LOGGER_LEVEL", "info"),
                debug: parse_var("LOGGER_DEBUG", false)?,
                encoder: var_or("LOGGER_ENCODER", "console"),
            },
            event_store: EventStoreConfig {
                max_connections: parse_var("EVENT_STORE_MAX_CONNECTIONS", 10)?,
                url: event_store_url.clone(),
            },
            doc_store: DocStoreConfig {
                url: var_or("DOC_STORE_URL", &event_store_url),
                orders_table: var_or("DOC_STORE_ORDERS_TABLE", "order_projections"),
            },
            search: SearchConfig {
                url: var_or("SEARCH_STORE_URL", &event_store_url),
                orders_index: var_or("SEARCH_ORDERS_TABLE", "order_search"),
            },
            subscriptions: SubscriptionsConfig {
                pool_size: parse_var("SUBSCRIPTIONS_POOL_SIZE", 4usize)?,
                order_prefix: var_or("SUBSCRIPTIONS_ORDER_PREFIX", "order-"),
                doc_projection_group_name: var_or(
                    "SUBSCRIPTIONS_DOC_PROJECTION_GROUP_NAME",
                    "order-doc-projection",
                ),
                search_projection_group_name: var_or(
                    "SUBSCRIPTIONS_SEARCH_PROJECTION_GROUP_NAME",
                    "order-search-projection",
                ),
            },
        };

        // Table names are interpolated into SQL; restrict to identifiers
        validate_identifier("DOC_STORE_ORDERS_TABLE", &config.doc_store.orders_table)?;
        validate_identifier("SEARCH_ORDERS_TABLE", &config.search.orders_index)?;

        Ok(config)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

fn validate_identifier(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(key))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
