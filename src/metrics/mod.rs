//! # Metrics
//!
//! Controller metrics recorded through the `metrics` facade. Without an
//! installed recorder every call is a no-op; daemon mode can install a
//! Prometheus exporter with its own scrape listener.
//!
//! **Gauges:**
//! - `costgate_budget_amount` - Budget used for the last decision
//! - `costgate_amount_spent` - Month-to-date spend (unset when unknown)
//! - `costgate_budget_percent_used` - Utilization behind the last decision
//! - `costgate_bitrate_bps` - Bitrate of the selected tier
//!
//! **Counters:**
//! - `costgate_cycles_total{outcome}` - Completed cycles by outcome
//! - `costgate_budget_fallbacks_total{reason}` - Fallback budgets by reason code
//! - `costgate_apply_failures_total` - Failed media server updates

use crate::budget::BudgetSnapshot;
use crate::config::MetricsConfig;
use crate::policy::QualityDecision;
use std::net::SocketAddr;

/// Install the Prometheus exporter and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn setup_exporter(config: &MetricsConfig) -> Result<(), Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: SocketAddr = config.listen.parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(listen = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record the inputs and result of one decision.
pub fn record_decision(snapshot: &BudgetSnapshot, decision: &QualityDecision) {
    metrics::gauge!("costgate_budget_amount").set(snapshot.budget_amount);
    if snapshot.is_spend_known() {
        metrics::gauge!("costgate_amount_spent").set(snapshot.amount_spent());
    }
    metrics::gauge!("costgate_budget_percent_used").set(decision.percent_used);
    metrics::gauge!("costgate_bitrate_bps").set(decision.bitrate_bps as f64);
}

pub fn record_cycle(outcome: &'static str) {
    metrics::counter!("costgate_cycles_total", "outcome" => outcome).increment(1);
}

pub fn record_budget_fallback(reason: &'static str) {
    metrics::counter!("costgate_budget_fallbacks_total", "reason" => reason).increment(1);
}

pub fn record_apply_failure() {
    metrics::counter!("costgate_apply_failures_total").increment(1);
}
