//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::ledger::LedgerSettings;
use crate::security::{DEFAULT_PIN_HASH_COST, MAX_PIN_HASH_COST, MIN_PIN_HASH_COST};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Attempts per operation on an optimistic-concurrency conflict
    pub conflict_retry_limit: u32,

    /// Attempts per account creation on an account-number collision
    pub account_number_retry_limit: u32,

    /// bcrypt work factor for stored PINs
    pub pin_hash_cost: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let defaults = LedgerSettings::default();
        let conflict_retry_limit = parse_or("CONFLICT_RETRY_LIMIT", defaults.conflict_retries)?;
        let account_number_retry_limit =
            parse_or("ACCOUNT_NUMBER_RETRY_LIMIT", defaults.account_number_retries)?;

        let pin_hash_cost = parse_or("PIN_HASH_COST", DEFAULT_PIN_HASH_COST)?;
        if !(MIN_PIN_HASH_COST..=MAX_PIN_HASH_COST).contains(&pin_hash_cost) {
            return Err(ConfigError::InvalidValue("PIN_HASH_COST"));
        }

        if conflict_retry_limit == 0 {
            return Err(ConfigError::InvalidValue("CONFLICT_RETRY_LIMIT"));
        }
        if account_number_retry_limit == 0 {
            return Err(ConfigError::InvalidValue("ACCOUNT_NUMBER_RETRY_LIMIT"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            conflict_retry_limit,
            account_number_retry_limit,
            pin_hash_cost,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Retry budgets handed to the ledger
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            conflict_retries: self.conflict_retry_limit,
            account_number_retries: self.account_number_retry_limit,
        }
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
