//! API server configuration.
//!
//! Layered: built-in defaults, then an optional `pharmos.toml` in the working
//! directory, then `PHARMOS_*` environment variables.
//!
//! ```text
//! PHARMOS_PORT=9090 PHARMOS_DATABASE_PATH=/var/lib/pharmos/pharmos.db pharmos-api
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use pharmos_core::DEFAULT_LOW_STOCK_THRESHOLD;
use pharmos_db::{BillingPolicy, DbConfig};

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Printed at the top of receipts
    pub store_name: String,

    /// Quantity at or below which a sale raises STOCK_LOW
    pub low_stock_threshold: i64,

    /// Deadline for the create/cancel transaction, in milliseconds
    pub operation_timeout_ms: u64,

    /// Receipt width in characters for the text rendering
    pub receipt_width: usize,

    /// Allow any origin (development frontends on another port)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "pharmos.db".to_string(),
            max_connections: 5,
            store_name: "Pharmos Pharmacy".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            operation_timeout_ms: 10_000,
            receipt_width: 40,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    /// Loads defaults → `pharmos.toml` → `PHARMOS_*` environment.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let settings = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port as i64)?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", defaults.max_connections as i64)?
            .set_default("store_name", defaults.store_name)?
            .set_default("low_stock_threshold", defaults.low_stock_threshold)?
            .set_default("operation_timeout_ms", defaults.operation_timeout_ms as i64)?
            .set_default("receipt_width", defaults.receipt_width as i64)?
            .set_default("cors_permissive", defaults.cors_permissive)?
            .add_source(File::with_name("pharmos").required(false))
            .add_source(Environment::with_prefix("PHARMOS").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue("low_stock_threshold".to_string()));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("operation_timeout_ms".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("host".to_string()))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn billing_policy(&self) -> BillingPolicy {
        BillingPolicy {
            low_stock_threshold: self.low_stock_threshold,
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            store_name: self.store_name.clone(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.billing_policy().low_stock_threshold, 10);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ServerConfig {
            operation_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_bad_host() {
        let config = ServerConfig {
            host: "not an address".to_string(),
            ..Default::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
