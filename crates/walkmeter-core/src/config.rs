//! Aggregator configuration: TOML file, environment overrides,
//! validation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalkmeterConfig {
    pub bucket: BucketConfig,
    pub record: RecordConfig,
}

/// Bucket window sizing. The defaults are the production values; tests
/// shrink them to keep fixtures readable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Nominal window length in milliseconds. A sample at or past
    /// `anchor + window_ms` closes the bucket.
    pub window_ms: i64,
    /// Silence threshold in milliseconds. A sample at or past
    /// `anchor + reset_gap_ms` is a hard reset.
    pub reset_gap_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// `chrono` format string for the human-readable best date.
    pub date_format: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            reset_gap_ms: 120_000,
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl WalkmeterConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: WalkmeterConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// Variables are prefixed with WALKMETER_, e.g.
    /// `WALKMETER_BUCKET_WINDOW_MS=30000`.
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to an already-loaded
    /// config.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        use std::env;

        if let Ok(val) = env::var("WALKMETER_BUCKET_WINDOW_MS") {
            self.bucket.window_ms = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WALKMETER_BUCKET_WINDOW_MS".to_string())
            })?;
        }
        if let Ok(val) = env::var("WALKMETER_BUCKET_RESET_GAP_MS") {
            self.bucket.reset_gap_ms = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WALKMETER_BUCKET_RESET_GAP_MS".to_string())
            })?;
        }
        if let Ok(val) = env::var("WALKMETER_RECORD_DATE_FORMAT") {
            self.record.date_format = val;
        }

        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.window_ms <= 0 {
            return Err(ConfigError::Validation(
                "bucket.window_ms must be positive".to_string(),
            ));
        }
        if self.bucket.reset_gap_ms < self.bucket.window_ms {
            return Err(ConfigError::Validation(
                "bucket.reset_gap_ms must be >= bucket.window_ms".to_string(),
            ));
        }
        if self.record.date_format.is_empty() {
            return Err(ConfigError::Validation(
                "record.date_format must not be empty".to_string(),
            ));
        }
        // Trial-format: chrono only reports an unknown specifier when
        // the pattern is rendered, so render it once here instead of
        // letting it blow up on the first record update.
        if crate::calendar::try_format_ms(0, &self.record.date_format).is_err() {
            return Err(ConfigError::Validation(format!(
                "record.date_format is not a renderable strftime pattern: {:?}",
                self.record.date_format
            )));
        }
        Ok(())
    }

    /// Export configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
