//! Budget source configuration

use serde::{Deserialize, Serialize};

/// Azure IMDS endpoint that issues managed-identity tokens.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Budget source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Azure subscription that owns the budget
    pub subscription_id: String,

    /// Name of the Consumption budget to track
    pub budget_name: String,

    /// Monthly budget (USD) used when the cost API is unreachable or has no budget
    pub fallback_amount: f64,

    /// Azure Resource Manager base URL
    pub management_url: String,

    /// Managed-identity token endpoint
    pub identity_endpoint: String,

    /// Timeout for each cost API request
    pub timeout_seconds: u64,

    /// What to do when the budget is known but spend could not be read
    pub unknown_spend: UnknownSpendPolicy,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            budget_name: "bandwidth-budget".to_string(),
            fallback_amount: 150.0,
            management_url: "https://management.azure.com".to_string(),
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            timeout_seconds: 15,
            unknown_spend: UnknownSpendPolicy::MostRestrictive,
        }
    }
}

impl BudgetConfig {
    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fallback_amount.is_finite() && self.fallback_amount > 0.0) {
            return Err("fallback_amount must be > 0.0".to_string());
        }

        if self.budget_name.trim().is_empty() {
            return Err("budget_name cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("timeout_seconds must be non-zero".to_string());
        }

        Ok(())
    }
}

/// Policy applied when spend for the current period is unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownSpendPolicy {
    /// Treat usage as 100% and select the most restrictive tier
    #[default]
    MostRestrictive,

    /// Reuse the last persisted percentage (most restrictive if none)
    ReuseLast,
}
