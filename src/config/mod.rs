//! Configuration module for costgate
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`COSTGATE_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use costgate::config::CostgateConfig;
//!
//! let config = CostgateConfig::default();
//! assert_eq!(config.runner.interval_seconds, 3600);
//!
//! let toml = r#"
//! [budget]
//! budget_name = "streaming"
//! "#;
//! let config: CostgateConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.budget.budget_name, "streaming");
//! ```

pub mod budget;
pub mod error;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod policy;
pub mod runner;

pub use budget::{BudgetConfig, UnknownSpendPolicy};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use media::MediaServerConfig;
pub use metrics::MetricsConfig;
pub use policy::{PolicyConfig, TierConfig, DISABLED_TIER};
pub use runner::RunnerConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unified configuration for the controller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CostgateConfig {
    /// Cost API and fallback budget
    pub budget: BudgetConfig,
    /// Tier thresholds and bitrates
    pub policy: PolicyConfig,
    /// Media server reached through the tunnel
    pub media_server: MediaServerConfig,
    /// Scheduling, state and lock paths
    pub runner: RunnerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Optional Prometheus exporter
    pub metrics: MetricsConfig,
}

impl CostgateConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("COSTGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("COSTGATE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(name) = std::env::var("COSTGATE_BUDGET_NAME") {
            self.budget.budget_name = name;
        }
        if let Ok(subscription) = std::env::var("COSTGATE_SUBSCRIPTION_ID") {
            self.budget.subscription_id = subscription;
        }
        if let Ok(amount) = std::env::var("COSTGATE_FALLBACK_BUDGET") {
            if let Ok(a) = amount.parse() {
                self.budget.fallback_amount = a;
            }
        }

        if let Ok(address) = std::env::var("COSTGATE_MEDIA_ADDRESS") {
            self.media_server.address = address;
        }

        if let Ok(path) = std::env::var("COSTGATE_STATE_PATH") {
            self.runner.state_path = PathBuf::from(path);
        }
        if let Ok(interval) = std::env::var("COSTGATE_INTERVAL_SECONDS") {
            if let Ok(i) = interval.parse() {
                self.runner.interval_seconds = i;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.budget
            .validate()
            .map_err(|message| ConfigError::Validation {
                field: "budget".to_string(),
                message,
            })?;

        self.policy.validate()?;
        self.media_server.validate()?;
        self.logging.validate()?;

        if self.runner.interval_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "runner.interval_seconds".to_string(),
                message: "interval must be non-zero".to_string(),
            });
        }

        if self.metrics.enabled && self.metrics.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation {
                field: "metrics.listen".to_string(),
                message: format!("'{}' is not a socket address", self.metrics.listen),
            });
        }

        Ok(())
    }
}
