//! Shared test utilities for costgate integration tests.
//!
//! Mock Azure and Jellyfin endpoints live on wiremock servers; these helpers
//! build configs that point at them and mount the common responses.

#![allow(dead_code)]

use costgate::config::{BudgetConfig, MediaServerConfig};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const BUDGET_NAME: &str = "bandwidth-budget";
pub const TOKEN_PATH: &str = "/metadata/identity/oauth2/token";
pub const API_KEY: &str = "test-api-key";
pub const PUBLIC_HOST: &str = "media.example.com";
pub const SERVER_CONFIGURATION_PATH: &str = "/System/Configuration";
pub const NETWORK_CONFIGURATION_PATH: &str = "/System/Configuration/network";

// =============================================================================
// Azure
// =============================================================================

/// Budget config whose identity and management endpoints are the mock server.
pub fn budget_config(server: &MockServer) -> BudgetConfig {
    BudgetConfig {
        subscription_id: SUBSCRIPTION_ID.to_string(),
        budget_name: BUDGET_NAME.to_string(),
        fallback_amount: 150.0,
        management_url: server.uri(),
        identity_endpoint: format!("{}{}", server.uri(), TOKEN_PATH),
        timeout_seconds: 2,
        ..Default::default()
    }
}

pub fn budget_path(name: &str) -> String {
    format!(
        "/subscriptions/{}/providers/Microsoft.Consumption/budgets/{}",
        SUBSCRIPTION_ID, name
    )
}

pub fn budgets_path() -> String {
    format!(
        "/subscriptions/{}/providers/Microsoft.Consumption/budgets",
        SUBSCRIPTION_ID
    )
}

pub fn cost_query_path() -> String {
    format!(
        "/subscriptions/{}/providers/Microsoft.CostManagement/query",
        SUBSCRIPTION_ID
    )
}

/// Consumption budget resource body.
pub fn budget_body(name: &str, amount: f64, current_spend: Option<f64>) -> Value {
    let mut properties = json!({ "amount": amount, "timeGrain": "Monthly" });
    if let Some(spent) = current_spend {
        properties["currentSpend"] = json!({ "amount": spent, "unit": "USD" });
    }
    json!({ "name": name, "properties": properties })
}

/// Cost Management query body with a single month-to-date row.
pub fn cost_query_body(cost: f64) -> Value {
    json!({
        "properties": {
            "columns": [
                { "name": "Cost", "type": "Number" },
                { "name": "Currency", "type": "String" }
            ],
            "rows": [[cost, "USD"]]
        }
    })
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(header("Metadata", "true"))
        .and(query_param("api-version", "2018-02-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": "3599",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

pub async fn mount_budget(server: &MockServer, amount: f64, current_spend: Option<f64>) {
    Mock::given(method("GET"))
        .and(path(budget_path(BUDGET_NAME)))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(budget_body(BUDGET_NAME, amount, current_spend)),
        )
        .mount(server)
        .await;
}

pub async fn mount_cost_query(server: &MockServer, cost: f64) {
    Mock::given(method("POST"))
        .and(path(cost_query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(cost_query_body(cost)))
        .mount(server)
        .await;
}

/// Any budget lookup fails with `status`.
pub async fn mount_budget_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path_regex(r"/providers/Microsoft\.Consumption/budgets"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

// =============================================================================
// Jellyfin
// =============================================================================

/// Media server config pointing at the mock server through the tunnel address.
pub fn media_config(server: &MockServer) -> MediaServerConfig {
    let addr = server.address();
    MediaServerConfig {
        address: addr.ip().to_string(),
        port: addr.port(),
        host_header: Some(PUBLIC_HOST.to_string()),
        timeout_seconds: 2,
        ..Default::default()
    }
}

/// A trimmed server configuration document.
pub fn jellyfin_configuration() -> Value {
    json!({
        "ServerName": "media",
        "RemoteClientBitrateLimit": 0,
        "EnableMetrics": false
    })
}

/// A trimmed network configuration document.
pub fn jellyfin_network_configuration(remote_access: bool) -> Value {
    json!({
        "EnableRemoteAccess": remote_access,
        "PublicHttpPort": 8096,
        "PublicHttpsPort": 8920,
        "EnableHttps": false
    })
}

pub async fn mount_jellyfin(server: &MockServer) {
    mount_jellyfin_with_remote_access(server, true).await;
}

pub async fn mount_jellyfin_with_remote_access(server: &MockServer, remote_access: bool) {
    for (document_path, document) in [
        (SERVER_CONFIGURATION_PATH, jellyfin_configuration()),
        (
            NETWORK_CONFIGURATION_PATH,
            jellyfin_network_configuration(remote_access),
        ),
    ] {
        Mock::given(method("GET"))
            .and(path(document_path))
            .and(header("X-Emby-Token", API_KEY))
            .and(header("Host", PUBLIC_HOST))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path(document_path))
            .and(header("X-Emby-Token", API_KEY))
            .and(header("Host", PUBLIC_HOST))
            .respond_with(ResponseTemplate::new(204))
            .mount(server)
            .await;
    }
}

async fn posted_to(server: &MockServer, document_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == document_path)
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}

/// Bodies of every server configuration POST the server received.
pub async fn posted_configurations(server: &MockServer) -> Vec<Value> {
    posted_to(server, SERVER_CONFIGURATION_PATH).await
}

/// Bodies of every network configuration POST the server received.
pub async fn posted_network_configurations(server: &MockServer) -> Vec<Value> {
    posted_to(server, NETWORK_CONFIGURATION_PATH).await
}

/// Paths of POST requests in arrival order.
pub async fn posted_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.url.path().to_string())
        .collect()
}
