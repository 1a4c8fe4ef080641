//! Jellyfin adapter.
//!
//! Remote streaming is controlled by two configuration documents, each read,
//! edited and posted back whole so every other setting is preserved:
//! - server configuration (`/System/Configuration`):
//!   `RemoteClientBitrateLimit` = bitrate in bps
//! - network configuration (`/System/Configuration/network`):
//!   `EnableRemoteAccess`, false for bitrate 0
//!
//! Jellyfin treats a 0 limit as unlimited, so the disabled tier turns remote
//! access off instead of writing a 0 limit. When enabling, the limit is
//! written before access is reopened. Requires Jellyfin 10.7 or later, where
//! remote access moved to the network configuration.
//!
//! Requests address the server by tunnel IP and carry an explicit `Host`
//! header, since they bypass public DNS and the reverse proxy.

use super::{ApplyError, MediaServer};
use crate::config::MediaServerConfig;
use async_trait::async_trait;
use reqwest::header::HOST;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;

const SERVER_CONFIGURATION_PATH: &str = "/System/Configuration";
const NETWORK_CONFIGURATION_PATH: &str = "/System/Configuration/network";
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Jellyfin server reached through the private tunnel.
pub struct JellyfinServer {
    client: Client,
    base_url: String,
    host_header: Option<String>,
    api_key: String,
    timeout_seconds: u64,
}

impl JellyfinServer {
    /// Create an adapter with its own HTTP client bounded by `timeout_seconds`.
    pub fn new(config: &MediaServerConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self::with_client(config, api_key, client))
    }

    /// Create an adapter with a custom HTTP client (for testing).
    pub fn with_client(config: &MediaServerConfig, api_key: String, client: Client) -> Self {
        Self {
            client,
            base_url: config.base_url(),
            host_header: config.host_header.clone(),
            api_key,
            timeout_seconds: config.timeout_seconds,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(TOKEN_HEADER, &self.api_key);
        match &self.host_header {
            Some(host) => request.header(HOST, host),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApplyError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApplyError::from_reqwest(e, self.timeout_seconds))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ApplyError::Unauthorized(response.status().as_u16()))
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ApplyError::Rejected {
                    status: status.as_u16(),
                    message: truncate(&message, 200),
                })
            }
        }
    }

    async fn fetch_document(&self, path: &str) -> Result<Map<String, Value>, ApplyError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let document: Value = response
            .json()
            .await
            .map_err(|e| ApplyError::InvalidResponse(e.to_string()))?;

        match document {
            Value::Object(fields) => Ok(fields),
            _ => Err(ApplyError::InvalidResponse(format!(
                "{} is not a JSON object",
                path
            ))),
        }
    }

    async fn post_document(
        &self,
        path: &str,
        document: Map<String, Value>,
    ) -> Result<(), ApplyError> {
        self.send(self.client.post(self.url(path)).json(&document)).await?;
        Ok(())
    }

    async fn set_remote_access(&self, enabled: bool) -> Result<(), ApplyError> {
        let mut network = self.fetch_document(NETWORK_CONFIGURATION_PATH).await?;
        if set_field(&mut network, "EnableRemoteAccess", Value::Bool(enabled)) {
            self.post_document(NETWORK_CONFIGURATION_PATH, network).await?;
        }
        Ok(())
    }
}

/// Set `key` to `value`; returns whether the document changed.
fn set_field(document: &mut Map<String, Value>, key: &str, value: Value) -> bool {
    if document.get(key) == Some(&value) {
        return false;
    }
    document.insert(key.to_string(), value);
    true
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[async_trait]
impl MediaServer for JellyfinServer {
    async fn apply_limit(&self, bitrate_bps: u64) -> Result<(), ApplyError> {
        if bitrate_bps == 0 {
            self.set_remote_access(false).await?;
        } else {
            let mut server = self.fetch_document(SERVER_CONFIGURATION_PATH).await?;
            set_field(&mut server, "RemoteClientBitrateLimit", Value::from(bitrate_bps));
            self.post_document(SERVER_CONFIGURATION_PATH, server).await?;
            self.set_remote_access(true).await?;
        }

        tracing::debug!(
            base_url = %self.base_url,
            bitrate_bps,
            remote_access = bitrate_bps != 0,
            "Updated Jellyfin streaming limit"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "jellyfin"
    }
}
