//! `[logging]` section: level, output format and per-module overrides.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Modules that accept a `[logging.modules]` override.
pub const LOG_MODULES: &[&str] = &[
    "budget",
    "cli",
    "controller",
    "media",
    "metrics",
    "policy",
    "state",
];

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Interactive runs and `journalctl -u costgate`
    #[default]
    Pretty,
    /// One object per line, carrying the `cycle` span
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (pretty or json)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for every target
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, e.g. `budget = "debug"` raises only the Azure client
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Reject levels `EnvFilter` would silently drop and unknown module names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level("logging.level", &self.level)?;

        for (module, level) in &self.modules {
            if !LOG_MODULES.contains(&module.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("logging.modules.{}", module),
                    message: format!("unknown module (one of: {})", LOG_MODULES.join(", ")),
                });
            }
            parse_level(&format!("logging.modules.{}", module), level)?;
        }
        Ok(())
    }
}

fn parse_level(field: &str, level: &str) -> Result<LevelFilter, ConfigError> {
    level.parse().map_err(|_| ConfigError::Validation {
        field: field.to_string(),
        message: format!("'{}' is not a log level", level),
    })
}
