//! Media server configuration

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Media server (Jellyfin) reached over the private tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerConfig {
    /// Tunnel-side address of the media server (e.g. the WireGuard peer IP)
    pub address: String,
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
    /// Public hostname presented in the `Host` header
    pub host_header: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for MediaServerConfig {
    fn default() -> Self {
        Self {
            address: "10.0.0.2".to_string(),
            port: 8096,
            scheme: "http".to_string(),
            host_header: None,
            api_key_env: "JELLYFIN_API_KEY".to_string(),
            timeout_seconds: 15,
        }
    }
}

impl MediaServerConfig {
    /// Base URL addressing the server by its tunnel IP.
    pub fn base_url(&self) -> String {
        let address = if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]", self.address)
        } else {
            self.address.clone()
        };
        format!("{}://{}:{}", self.scheme, address, self.port)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::Validation {
                field: "media_server.api_key_env".to_string(),
                message: format!("environment variable {} is not set", self.api_key_env),
            }),
        }
    }

    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(invalid("address", "address cannot be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "port must be non-zero"));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(invalid("scheme", "scheme must be http or https"));
        }
        if self.timeout_seconds == 0 {
            return Err(invalid("timeout_seconds", "timeout must be non-zero"));
        }
        if matches!(&self.host_header, Some(h) if h.trim().is_empty()) {
            return Err(invalid("host_header", "host_header cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: format!("media_server.{}", field),
        message: message.to_string(),
    }
}
