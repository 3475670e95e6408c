//! Configuration management for the Inventory Ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LEDGER_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration; without it sites come from `sites`
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Log output configuration
    pub log: LogConfig,

    /// Ledger engine settings
    pub ledger: LedgerConfig,

    /// Static site directory
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Schema version stamped on new records and audit entries
    pub schema_version: String,
}

/// One site known to the static directory
#[derive(Debug, Deserialize, Clone)]
pub struct SiteEntry {
    pub company: String,
    pub site: String,
    #[serde(default = "default_tracked")]
    pub tracked: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_tracked() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("jwt.secret", "development-secret-key")?
            .set_default("log.format", "pretty")?
            .set_default("ledger.schema_version", shared::DEFAULT_SCHEMA_VERSION)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER_ prefix)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
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

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: None,
            jwt: JwtConfig {
                secret: "development-secret-key".to_string(),
            },
            log: LogConfig {
                format: LogFormat::Pretty,
            },
            ledger: LedgerConfig {
                schema_version: shared::DEFAULT_SCHEMA_VERSION.to_string(),
            },
            sites: Vec::new(),
        }
    }
}
