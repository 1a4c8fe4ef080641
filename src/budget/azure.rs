//! Azure Cost Management budget source.
//!
//! Authenticates with the VM's managed identity and reads:
//! - the named Consumption budget (amount + current spend)
//! - the first budget in the subscription when the named one is missing
//! - month-to-date actual cost from the Cost Management query API when the
//!   budget itself is unusable

use super::{BudgetError, BudgetSnapshot, BudgetSource, Spend};
use crate::config::BudgetConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const IDENTITY_API_VERSION: &str = "2018-02-01";
const CONSUMPTION_API_VERSION: &str = "2023-05-01";
const COST_QUERY_API_VERSION: &str = "2023-03-01";

/// Managed identity token response
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Microsoft.Consumption budget resource
#[derive(Deserialize)]
struct AzureBudget {
    name: String,
    properties: AzureBudgetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureBudgetProperties {
    amount: f64,
    #[serde(default)]
    current_spend: Option<AzureSpend>,
}

#[derive(Deserialize)]
struct AzureSpend {
    amount: f64,
}

#[derive(Deserialize)]
struct AzureBudgetList {
    #[serde(default)]
    value: Vec<AzureBudget>,
}

/// Cost Management query result (columns + rows)
#[derive(Deserialize)]
struct CostQueryResponse {
    properties: CostQueryProperties,
}

#[derive(Deserialize)]
struct CostQueryProperties {
    #[serde(default)]
    columns: Vec<CostQueryColumn>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct CostQueryColumn {
    name: String,
}

/// Budget source backed by Azure Cost Management.
pub struct AzureBudgetSource {
    client: Client,
    config: BudgetConfig,
}

impl AzureBudgetSource {
    /// Create a source with its own HTTP client bounded by `timeout_seconds`.
    pub fn new(config: BudgetConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a source with a custom HTTP client (for testing).
    pub fn with_client(config: BudgetConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn subscription_url(&self) -> String {
        format!(
            "{}/subscriptions/{}",
            self.config.management_url.trim_end_matches('/'),
            self.config.subscription_id
        )
    }

    fn fallback(&self, reason: BudgetError, spend: Spend) -> BudgetSnapshot {
        tracing::warn!(
            reason = reason.reason_code(),
            error = %reason,
            fallback_amount = self.config.fallback_amount,
            spend_known = matches!(spend, Spend::Known(_)),
            "Budget unavailable, using fallback budget"
        );
        crate::metrics::record_budget_fallback(reason.reason_code());
        BudgetSnapshot::fallback(
            self.config.budget_name.clone(),
            self.config.fallback_amount,
            spend,
            &reason,
        )
    }

    /// Obtain an ARM access token from the managed identity endpoint.
    async fn acquire_token(&self) -> Result<String, BudgetError> {
        let resource = format!("{}/", self.config.management_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&self.config.identity_endpoint)
            .query(&[
                ("api-version", IDENTITY_API_VERSION),
                ("resource", resource.as_str()),
            ])
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| BudgetError::IdentityUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BudgetError::IdentityUnavailable(format!(
                "token endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BudgetError::IdentityUnavailable(format!("invalid token response: {}", e)))?;

        Ok(token.access_token)
    }

    async fn get(&self, url: &str, token: &str) -> Result<reqwest::Response, BudgetError> {
        self.client
            .get(url)
            .query(&[("api-version", CONSUMPTION_API_VERSION)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BudgetError::from_reqwest(e, self.config.timeout_seconds))
    }

    /// Resolve the configured budget, or the first budget when it does not exist.
    async fn lookup_budget(&self, token: &str) -> Result<AzureBudget, BudgetError> {
        let url = format!(
            "{}/providers/Microsoft.Consumption/budgets/{}",
            self.subscription_url(),
            self.config.budget_name
        );

        let response = self.get(&url, token).await?;
        match response.status() {
            status if status.is_success() => response
                .json::<AzureBudget>()
                .await
                .map_err(|e| BudgetError::InvalidResponse(e.to_string())),
            StatusCode::NOT_FOUND => self.first_budget(token).await,
            status => Err(status_error(status)),
        }
    }

    async fn first_budget(&self, token: &str) -> Result<AzureBudget, BudgetError> {
        let url = format!(
            "{}/providers/Microsoft.Consumption/budgets",
            self.subscription_url()
        );

        let response = self.get(&url, token).await?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let list: AzureBudgetList = response
            .json()
            .await
            .map_err(|e| BudgetError::InvalidResponse(e.to_string()))?;

        let budget = list.value.into_iter().next().ok_or(BudgetError::NoBudget)?;
        tracing::warn!(
            requested = %self.config.budget_name,
            selected = %budget.name,
            "Named budget not found, using first budget returned by the API"
        );
        Ok(budget)
    }

    /// Month-to-date actual cost for the subscription.
    async fn query_spend(&self, token: &str) -> Result<f64, BudgetError> {
        let url = format!(
            "{}/providers/Microsoft.CostManagement/query",
            self.subscription_url()
        );
        let body = serde_json::json!({
            "type": "ActualCost",
            "timeframe": "MonthToDate",
            "dataset": {
                "granularity": "None",
                "aggregation": {
                    "totalCost": { "name": "Cost", "function": "Sum" }
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", COST_QUERY_API_VERSION)])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BudgetError::from_reqwest(e, self.config.timeout_seconds))?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let result: CostQueryResponse = response
            .json()
            .await
            .map_err(|e| BudgetError::InvalidResponse(e.to_string()))?;

        parse_cost_rows(&result.properties)
    }

    /// Spend from the cost query, or `Unknown` with a logged reason.
    async fn spend_or_unknown(&self, token: &str) -> Spend {
        match self.query_spend(token).await {
            Ok(amount) => Spend::Known(amount),
            Err(e) => {
                tracing::warn!(
                    reason = e.reason_code(),
                    error = %e,
                    "Month-to-date spend unavailable"
                );
                Spend::Unknown
            }
        }
    }
}

/// Sum of the cost column; an empty result means nothing has been billed yet.
fn parse_cost_rows(properties: &CostQueryProperties) -> Result<f64, BudgetError> {
    let column = properties
        .columns
        .iter()
        .position(|c| c.name == "Cost" || c.name == "totalCost" || c.name == "PreTaxCost")
        .unwrap_or(0);

    properties.rows.iter().try_fold(0.0, |total, row| {
        row.get(column)
            .and_then(|v| v.as_f64())
            .map(|cost| total + cost)
            .ok_or_else(|| BudgetError::InvalidResponse("cost row has no numeric cost".to_string()))
    })
}

fn status_error(status: StatusCode) -> BudgetError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BudgetError::Unauthorized(status.as_u16())
        }
        status => BudgetError::HttpStatus(status.as_u16()),
    }
}

#[async_trait]
impl BudgetSource for AzureBudgetSource {
    async fn fetch_budget(&self) -> BudgetSnapshot {
        if self.config.subscription_id.trim().is_empty() {
            return self.fallback(BudgetError::NotConfigured, Spend::Unknown);
        }

        let token = match self.acquire_token().await {
            Ok(token) => token,
            Err(e) => return self.fallback(e, Spend::Unknown),
        };

        match self.lookup_budget(&token).await {
            Ok(budget) => {
                let spend = match budget.properties.current_spend {
                    Some(current) => Spend::Known(current.amount),
                    None => self.spend_or_unknown(&token).await,
                };
                let amount = budget.properties.amount;
                if amount.is_finite() && amount > 0.0 {
                    tracing::debug!(
                        budget = %budget.name,
                        amount,
                        ?spend,
                        "Fetched budget from cost API"
                    );
                    BudgetSnapshot::from_api(budget.name, amount, spend)
                } else {
                    self.fallback(BudgetError::ZeroBudget(budget.name), spend)
                }
            }
            Err(e) => {
                let spend = self.spend_or_unknown(&token).await;
                self.fallback(e, spend)
            }
        }
    }

    fn name(&self) -> &str {
        "azure"
    }
}
