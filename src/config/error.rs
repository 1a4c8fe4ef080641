//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A field is present but its value would make the policy ambiguous.
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ConfigError::Validation {
            field: "policy.tiers[1].max_percent".to_string(),
            message: "must be within 0-100".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for 'policy.tiers[1].max_percent': must be within 0-100"
        );
    }
}
