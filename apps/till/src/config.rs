//! # Till Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TAPROOM_DB_PATH=/srv/taproom/taproom.db                            │
//! │     TAPROOM_LOG=debug                                                  │
//! │     TAPROOM_CURRENCY_SYMBOL=CLP$                                       │
//! │     TAPROOM_DEFAULT_PAY_METHOD=debito                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/taproom-pos/till.toml (Linux)                            │
//! │     ~/Library/Application Support/com.taproom.pos/till.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! database_path = "/home/caja/.local/share/taproom-pos/taproom.db"
//! log_filter = "info,taproom=debug,sqlx=warn"
//! currency_symbol = "$"
//! default_pay_method = "debito"   # omit to charge as efectivo
//! common_gain = "35%"             # "35%", "$500" or "none"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use taproom_core::{GainRule, Money, PayMethod};

const CONFIG_FILE: &str = "till.toml";
const DATABASE_FILE: &str = "taproom.db";

/// Default tracing filter when neither `RUST_LOG` nor config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,taproom=debug,sqlx=warn";

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    LoadFailed(String),

    #[error("Failed to write config: {0}")]
    SaveFailed(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

// =============================================================================
// Till Config
// =============================================================================

/// Settings of one till.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TillConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// `tracing` filter directive. `RUST_LOG` still wins when set.
    pub log_filter: String,

    /// Symbol printed in front of amounts.
    pub currency_symbol: String,

    /// Pay method given to new tickets. `None` leaves tickets unset, which
    /// charges as efectivo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_pay_method: Option<PayMethod>,

    /// Gain applied to common products when none is given, e.g. `"35%"`.
    pub common_gain: String,
}

impl Default for TillConfig {
    fn default() -> Self {
        TillConfig {
            database_path: Self::default_database_path(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            currency_symbol: "$".to_string(),
            default_pay_method: None,
            common_gain: "none".to_string(),
        }
    }
}

impl TillConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading till config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file, creating the directory when needed.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Till config saved");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }

        if self.currency_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("currency_symbol must not be empty".into()));
        }

        self.common_gain_rule()?;

        Ok(())
    }

    /// The parsed `common_gain`.
    pub fn common_gain_rule(&self) -> Result<GainRule, ConfigError> {
        self.common_gain
            .parse::<GainRule>()
            .map_err(|e| ConfigError::Invalid(format!("common_gain: {}", e)))
    }

    /// Formats whole currency units with the configured symbol.
    ///
    /// ```rust
    /// use taproom_till::config::TillConfig;
    ///
    /// let config = TillConfig::default();
    /// assert_eq!(config.format_currency(1234567), "$1.234.567");
    /// ```
    pub fn format_currency(&self, units: i64) -> String {
        Money::from_units(units)
            .to_string()
            .replacen('$', &self.currency_symbol, 1)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TAPROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Ok(filter) = std::env::var("TAPROOM_LOG") {
            self.log_filter = filter;
        }

        if let Ok(symbol) = std::env::var("TAPROOM_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }

        if let Ok(method) = std::env::var("TAPROOM_DEFAULT_PAY_METHOD") {
            match method.parse::<PayMethod>() {
                Ok(parsed) => self.default_pay_method = Some(parsed),
                Err(_) => warn!(method = %method, "Unknown pay method in environment"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "taproom", "pos")
    }

    /// Platform config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    fn default_database_path() -> PathBuf {
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }
}
