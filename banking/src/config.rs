//! Banking service configuration.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Product defaults applied when accounts are opened.
#[derive(Debug, Clone)]
pub struct ProductConfig {
    /// Credit limit given to new credit cards.
    pub default_credit_limit: Decimal,
    /// First value of the shared account id / number sequence.
    pub first_account_sequence: u64,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            default_credit_limit: dec!(1000000),
            first_account_sequence: 1,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Main banking service configuration.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Institution name shown by the CLI.
    pub bank_name: String,
    /// Product defaults.
    pub products: ProductConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            bank_name: "Mi Plata".to_string(),
            products: ProductConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BankConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are ignored and the default is kept; `validate`
    /// catches values that parse but make no sense.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("MIPLATA_BANK_NAME") {
            config.bank_name = name;
        }

        if let Ok(limit) = std::env::var("MIPLATA_CREDIT_LIMIT") {
            if let Ok(limit) = Decimal::from_str(limit.trim()) {
                config.products.default_credit_limit = limit;
            }
        }

        if let Ok(start) = std::env::var("MIPLATA_ACCOUNT_SEQUENCE_START") {
            if let Ok(start) = start.trim().parse() {
                config.products.first_account_sequence = start;
            }
        }

        if let Ok(json) = std::env::var("MIPLATA_LOG_JSON") {
            config.logging.json = !matches!(json.trim(), "0" | "false" | "no");
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bank_name.trim().is_empty() {
            return Err("Bank name cannot be empty".to_string());
        }

        if self.products.default_credit_limit <= Decimal::ZERO {
            return Err("Default credit limit must be positive".to_string());
        }

        if self.products.default_credit_limit.normalize().scale() > 2 {
            return Err("Default credit limit must be expressible in cents".to_string());
        }

        if self.products.first_account_sequence == 0 {
            return Err("Account sequence must start at 1 or above".to_string());
        }

        if self.products.first_account_sequence > 999_999 {
            return Err("Account sequence start does not fit a 6-digit number".to_string());
        }

        if self.logging.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BankConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.products.default_credit_limit, dec!(1000000));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = BankConfig::default();
        config.products.default_credit_limit = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = BankConfig::default();
        config.products.default_credit_limit = dec!(10.005);
        assert!(config.validate().is_err());

        let mut config = BankConfig::default();
        config.products.first_account_sequence = 0;
        assert!(config.validate().is_err());
    }
}
