//! Integration tests for the Azure budget source against mock ARM endpoints.

mod common;

use common::*;
use costgate::budget::{AzureBudgetSource, BudgetSource, BudgetSourceKind, Spend};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> AzureBudgetSource {
    AzureBudgetSource::new(budget_config(server)).unwrap()
}

#[tokio::test]
async fn test_named_budget_with_current_spend() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_budget(&server, 150.0, Some(50.0)).await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Api);
    assert_eq!(snapshot.budget_name, BUDGET_NAME);
    assert_eq!(snapshot.budget_amount, 150.0);
    assert_eq!(snapshot.spend, Spend::Known(50.0));
    assert!(snapshot.fallback_reason.is_none());
}

#[tokio::test]
async fn test_budget_without_current_spend_queries_cost() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_budget(&server, 200.0, None).await;
    mount_cost_query(&server, 42.5).await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Api);
    assert_eq!(snapshot.spend, Spend::Known(42.5));
}

#[tokio::test]
async fn test_missing_budget_uses_first_in_subscription() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(budget_path(BUDGET_NAME)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(budgets_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                budget_body("monthly-total", 300.0, Some(120.0)),
                budget_body("other", 10.0, Some(1.0))
            ]
        })))
        .mount(&server)
        .await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Api);
    assert_eq!(snapshot.budget_name, "monthly-total");
    assert_eq!(snapshot.budget_amount, 300.0);
    assert_eq!(snapshot.spend, Spend::Known(120.0));
}

#[tokio::test]
async fn test_no_budgets_falls_back_with_queried_spend() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_cost_query(&server, 30.0).await;

    Mock::given(method("GET"))
        .and(path(budget_path(BUDGET_NAME)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(budgets_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": [] })))
        .mount(&server)
        .await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.budget_amount, 150.0);
    assert_eq!(snapshot.spend, Spend::Known(30.0));
    assert_eq!(snapshot.fallback_reason.as_deref(), Some("no_budget"));
}

#[tokio::test]
async fn test_identity_failure_falls_back_with_unknown_spend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.budget_amount, 150.0);
    assert_eq!(snapshot.spend, Spend::Unknown);
    assert_eq!(
        snapshot.fallback_reason.as_deref(),
        Some("identity_unavailable")
    );
}

#[tokio::test]
async fn test_unauthorized_budget_lookup_falls_back() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_budget_status(&server, 403).await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.fallback_reason.as_deref(), Some("unauthorized"));
    // Cost query not mounted, so spend cannot be read either
    assert_eq!(snapshot.spend, Spend::Unknown);
}

#[tokio::test]
async fn test_zero_amount_budget_falls_back_keeping_spend() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_budget(&server, 0.0, Some(12.0)).await;

    let snapshot = source(&server).fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.budget_amount, 150.0);
    assert_eq!(snapshot.spend, Spend::Known(12.0));
    assert_eq!(snapshot.fallback_reason.as_deref(), Some("zero_budget"));
}

#[tokio::test]
async fn test_slow_budget_api_times_out_to_fallback() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(budget_path(BUDGET_NAME)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(budget_body(BUDGET_NAME, 150.0, Some(10.0)))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = budget_config(&server);
    config.timeout_seconds = 1;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let snapshot = AzureBudgetSource::with_client(config, client)
        .fetch_budget()
        .await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.fallback_reason.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_unconfigured_subscription_skips_network() {
    let server = MockServer::start().await;
    let mut config = budget_config(&server);
    config.subscription_id = String::new();

    let snapshot = AzureBudgetSource::new(config).unwrap().fetch_budget().await;

    assert_eq!(snapshot.source, BudgetSourceKind::Fallback);
    assert_eq!(snapshot.fallback_reason.as_deref(), Some("not_configured"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
