//! Configuration loading from environment variables.

use thiserror::Error;

use larder_inventory::InventoryAggregator;
use larder_observability::{LogConfig, LogFormat};

pub const ENV_EXPIRING_WINDOW_DAYS: &str = "LARDER_EXPIRING_WINDOW_DAYS";
pub const ENV_DEFAULT_LOW_STOCK_THRESHOLD: &str = "LARDER_DEFAULT_LOW_STOCK_THRESHOLD";
pub const ENV_LOG_FORMAT: &str = "LARDER_LOG_FORMAT";

/// Upper bound for the expiring window (ten years).
pub const MAX_EXPIRING_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LarderConfig {
    pub inventory: InventoryAggregator,
    pub log: LogConfig,
}

impl LarderConfig {
    /// Load from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LarderConfig::default();

        if let Some(raw) = lookup(ENV_EXPIRING_WINDOW_DAYS) {
            let days = raw
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid(ENV_EXPIRING_WINDOW_DAYS, e.to_string()))?;
            if days > MAX_EXPIRING_WINDOW_DAYS {
                return Err(ConfigError::invalid(
                    ENV_EXPIRING_WINDOW_DAYS,
                    format!("must be at most {MAX_EXPIRING_WINDOW_DAYS} days"),
                ));
            }
            config.inventory.expiring_window_days = days;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_LOW_STOCK_THRESHOLD) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let threshold = raw.parse::<f64>().map_err(|e| {
                    ConfigError::invalid(ENV_DEFAULT_LOW_STOCK_THRESHOLD, e.to_string())
                })?;
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(ConfigError::invalid(
                        ENV_DEFAULT_LOW_STOCK_THRESHOLD,
                        "must be a non-negative number",
                    ));
                }
                config.inventory.default_low_stock_threshold = Some(threshold);
            }
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log.format = raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, e.to_string()))?;
        }

        Ok(config)
    }
}
