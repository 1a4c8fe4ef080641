//! Media server adapters.
//!
//! A [`MediaServer`] pushes a streaming bitrate cap to the remote server. It
//! never retries: the next scheduled cycle recomputes the decision and tries
//! again.

pub mod jellyfin;

pub use jellyfin::JellyfinServer;

use async_trait::async_trait;
use thiserror::Error;

/// Why a limit could not be applied.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplyError {
    /// Connection refused or otherwise unreachable (tunnel down)
    #[error("media server unreachable: {0}")]
    Unreachable(String),

    #[error("media server request timed out after {0}s")]
    Timeout(u64),

    /// API key rejected
    #[error("media server rejected API key (HTTP {0})")]
    Unauthorized(u16),

    /// Non-success status
    #[error("media server returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from media server: {0}")]
    InvalidResponse(String),
}

impl ApplyError {
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout_seconds: u64) -> Self {
        if e.is_timeout() {
            ApplyError::Timeout(timeout_seconds)
        } else if e.is_decode() {
            ApplyError::InvalidResponse(e.to_string())
        } else {
            ApplyError::Unreachable(e.to_string())
        }
    }
}

/// Remote media server whose streaming bitrate can be capped.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Set the maximum remote streaming bitrate. `0` disables remote streaming.
    async fn apply_limit(&self, bitrate_bps: u64) -> Result<(), ApplyError>;

    /// Name for logging
    fn name(&self) -> &str;
}
