//! Configuration module
//!
//! Loads configuration from environment variables. Every policy knob the
//! engines use lives here and is handed to them as an explicit value at
//! construction time.

use std::env;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::engine::{CreditPolicy, SweepConfig};

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

    /// Base interest rate served by the static rate source, annual percent
    pub base_rate: Decimal,

    /// Percentage points added on top of the external base rate
    pub rate_increment: Decimal,

    /// Smallest accepted credit repayment, in currency units
    pub minimum_payment: Decimal,

    /// Overdue penalty as a fraction of the payment amount
    pub penalty_rate: Decimal,

    /// Seconds between overdue sweep cycles
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let base_rate = env::var("BASE_RATE")
            .unwrap_or_else(|_| "16.0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BASE_RATE"))?;

        let rate_increment = env::var("RATE_INCREMENT")
            .unwrap_or_else(|_| "2.5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RATE_INCREMENT"))?;

        let minimum_payment = env::var("MINIMUM_PAYMENT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MINIMUM_PAYMENT"))?;

        let penalty_rate = env::var("PENALTY_RATE")
            .unwrap_or_else(|_| "0.10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PENALTY_RATE"))?;

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "43200".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SWEEP_INTERVAL_SECS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            base_rate,
            rate_increment,
            minimum_payment,
            penalty_rate,
            sweep_interval_secs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Credit pricing and repayment policy for the ledger.
    pub fn credit_policy(&self) -> CreditPolicy {
        CreditPolicy {
            rate_increment: self.rate_increment,
            minimum_payment: self.minimum_payment,
        }
    }

    /// Cadence and penalty policy for the overdue sweeper.
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            interval: Duration::from_secs(self.sweep_interval_secs),
            penalty_rate: self.penalty_rate,
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/bank".to_string(),
            database_max_connections: 10,
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            base_rate: dec!(16.0),
            rate_increment: dec!(2.5),
            minimum_payment: dec!(100),
            penalty_rate: dec!(0.10),
            sweep_interval_secs: 43200,
        }
    }

    #[test]
    fn test_credit_policy_from_config() {
        let policy = base_config().credit_policy();
        assert_eq!(policy.rate_increment, dec!(2.5));
        assert_eq!(policy.minimum_payment, dec!(100));
    }

    #[test]
    fn test_sweep_config_from_config() {
        let sweep = base_config().sweep_config();
        assert_eq!(sweep.interval, Duration::from_secs(43200));
        assert_eq!(sweep.penalty_rate, dec!(0.10));
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
