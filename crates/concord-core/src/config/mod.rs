//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Serde defaults on every section
//! 2. **Config file**: TOML file named by the `CONCORD_CONFIG` env var
//! 3. **Environment variables**: `CONCORD__SECTION__FIELD` overrides a single field
//!
//! # Configuration Sections
//!
//! - [`BeliefConfig`]: Propagation damping, thresholds and update policy
//! - [`CircuitBreakerConfig`]: Default breaker profile for the shared manager
//! - [`ValidatorPoolConfig`]: Quorum, validator timeout and validator breaker profile
//! - [`RedundancyConfig`]: Hedge delays, n-version and voting settings
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [belief]
//! damping_factor = 0.6
//! max_iterations = 50
//!
//! [validation]
//! default_quorum = 2
//!
//! [redundancy]
//! hedge_delays_ms = [0, 100, 400]
//!
//! [logging]
//! format = "json"
//! ```

use crate::{
    belief::BeliefConfig, circuit_breaker::CircuitBreakerConfig, redundancy::RedundancyConfig,
    validation::ValidatorPoolConfig,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset. Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Root configuration for every decision-core component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub belief: BeliefConfig,

    /// Default profile for breakers created through the shared manager.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub validation: ValidatorPoolConfig,

    #[serde(default)]
    pub redundancy: RedundancyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error; defaults apply. Environment variables with the
    /// `CONCORD__` prefix override single values, using `__` between nested keys (e.g.
    /// `CONCORD__BELIEF__MAX_ITERATIONS=50`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or a value has the wrong type.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("CONCORD").separator("__").try_parsing(true))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/concord.toml`, or from the path in `CONCORD_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONCORD_CONFIG").unwrap_or_else(|_| "config/concord.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string for the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.belief.validate()?;
        self.circuit_breaker.validate()?;
        self.validation.validate()?;
        self.redundancy.validate()?;

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }
        Ok(())
    }
}
