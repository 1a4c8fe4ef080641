//! Error types for budget lookups.

use thiserror::Error;

/// Why the cost API could not supply a usable budget.
///
/// None of these escape the budget source: each one degrades the snapshot to
/// [`BudgetSourceKind::Fallback`](super::BudgetSourceKind::Fallback) and is
/// logged with its [`reason_code`](BudgetError::reason_code).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BudgetError {
    /// No subscription configured
    #[error("subscription_id is not configured")]
    NotConfigured,

    /// Managed identity token could not be obtained
    #[error("managed identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// Token rejected by the cost API
    #[error("cost API rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    /// Connection failed
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Unexpected HTTP status
    #[error("cost API returned HTTP {0}")]
    HttpStatus(u16),

    /// Body did not match the expected schema
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Subscription has no budgets at all
    #[error("no budgets defined for subscription")]
    NoBudget,

    /// Budget exists but its amount is zero or negative
    #[error("budget '{0}' has a non-positive amount")]
    ZeroBudget(String),
}

impl BudgetError {
    /// Stable, log-friendly reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            BudgetError::NotConfigured => "not_configured",
            BudgetError::IdentityUnavailable(_) => "identity_unavailable",
            BudgetError::Unauthorized(_) => "unauthorized",
            BudgetError::Network(_) => "network",
            BudgetError::Timeout(_) => "timeout",
            BudgetError::HttpStatus(_) => "http_status",
            BudgetError::InvalidResponse(_) => "invalid_response",
            BudgetError::NoBudget => "no_budget",
            BudgetError::ZeroBudget(_) => "zero_budget",
        }
    }

    /// Classify a reqwest error.
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout_seconds: u64) -> Self {
        if e.is_timeout() {
            BudgetError::Timeout(timeout_seconds)
        } else if e.is_decode() {
            BudgetError::InvalidResponse(e.to_string())
        } else {
            BudgetError::Network(e.to_string())
        }
    }
}
