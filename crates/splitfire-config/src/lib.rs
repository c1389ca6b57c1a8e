//! Configuration management for splitfire
//!
//! This module handles loading and validation of splitfire configuration
//! from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Expense source (Splitwise) credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitwiseConfig {
    /// Personal API key
    pub api_key: String,
}

/// Ledger sink (Firefly III) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireflyConfig {
    /// Base URL of the Firefly III instance, without trailing slash
    pub url: String,
    /// Personal access token
    pub token: String,
}

/// Synchronization behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How many days back the sync window reaches
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Report decisions without writing to the ledger
    #[serde(default)]
    pub dry_run: bool,
    /// Category used when an expense carries no category override
    #[serde(default)]
    pub default_category: Option<String>,
    /// Asset account charged when the user paid out of pocket
    pub default_spend_account: String,
    /// Account charged when somebody else fronted the money
    pub default_transfer_account: String,
    /// Balance account name; empty disables the balance-account strategy
    #[serde(default)]
    pub balance_account: String,
    /// Tag attached to drafts whose currency needs a manual fix
    #[serde(default = "default_foreign_currency_tag")]
    pub foreign_currency_tag: String,
}

fn default_window_days() -> i64 {
    1
}

fn default_foreign_currency_tag() -> String {
    "fix-currency-mismatch".to_string()
}

impl SyncConfig {
    /// Whether the balance-account strategy is enabled
    pub fn uses_balance_account(&self) -> bool {
        !self.balance_account.is_empty()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Expense source credentials
    pub splitwise: SplitwiseConfig,
    /// Ledger sink connection settings
    pub firefly: FireflyConfig,
    /// Synchronization behavior
    pub sync: SyncConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|_| ConfigError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
                message: e.to_string(),
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.splitwise.api_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "splitwise.api_key".to_string(),
                reason: "API key must not be empty".to_string(),
            });
        }

        if self.firefly.url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "firefly.url".to_string(),
                reason: "URL must not be empty".to_string(),
            });
        }

        if self.firefly.token.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "firefly.token".to_string(),
                reason: "Access token must not be empty".to_string(),
            });
        }

        if self.sync.window_days < 1 {
            return Err(ConfigError::InvalidValue {
                field: "sync.window_days".to_string(),
                reason: "Sync window must cover at least one day".to_string(),
            });
        }

        if self.sync.default_spend_account.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.default_spend_account".to_string(),
                reason: "Spend account must not be empty".to_string(),
            });
        }

        if self.sync.default_transfer_account.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.default_transfer_account".to_string(),
                reason: "Transfer account must not be empty".to_string(),
            });
        }

        if self.sync.foreign_currency_tag.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.foreign_currency_tag".to_string(),
                reason: "Review tag must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }
}

// ==================== Tests ====================
