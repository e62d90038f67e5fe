//! Configuration management for the Stock Ledger server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with SLW_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Storage backend configuration
    pub store: StoreConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Transaction OTP configuration
    pub otp: OtpConfig,

    /// Transfer effect policy
    pub transfer: TransferConfig,

    /// Change feed configuration
    pub events: EventsConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Which store implementation backs the repositories
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Shared secret used to verify HS256 bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    /// Key for the HMAC digest stored in place of the OTP
    pub secret: String,

    /// Seconds a pending transaction's OTP stays valid
    pub ttl_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    /// Refuse a transfer whose source batch holds less than requested
    /// instead of moving what is available and reporting the shortfall
    pub reject_partial_allocation: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    /// Events a subscriber may fall behind before it starts missing some
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("SLW_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("store.backend", "postgres")?
            .set_default("database.url", "postgres://localhost/stock_ledger")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("otp.ttl_seconds", 900)?
            .set_default("transfer.reject_partial_allocation", false)?
            .set_default("events.capacity", 256)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SLW_ prefix)
            .add_source(
                Environment::with_prefix("SLW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration for tests and local runs against the in-process store
    pub fn in_memory(secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
            },
            jwt: JwtConfig {
                secret: secret.to_string(),
            },
            otp: OtpConfig {
                secret: secret.to_string(),
                ttl_seconds: 900,
            },
            transfer: TransferConfig {
                reject_partial_allocation: false,
            },
            events: EventsConfig { capacity: 256 },
            logging: LoggingConfig { json: false },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
