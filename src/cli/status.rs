//! Status command implementation
//!
//! Read-only view of the last applied decision. Never fails: a missing
//! config falls back to defaults and a missing or unreadable state file is
//! reported in the output.

use crate::budget::BudgetSourceKind;
use crate::cli::run::load_config;
use crate::cli::StatusArgs;
use crate::config::CostgateConfig;
use crate::state::{PersistedState, StateStore};
use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

/// Whether a state file could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAvailability {
    Present,
    Missing,
    Unreadable,
}

/// View model for status display
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: StateAvailability,
    pub state_path: String,
    pub budget_name: String,
    pub fallback_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_bps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_source: Option<BudgetSourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusView {
    fn empty(config: &CostgateConfig, state: StateAvailability) -> Self {
        Self {
            state,
            state_path: config.runner.state_path.display().to_string(),
            budget_name: config.budget.budget_name.clone(),
            fallback_amount: config.budget.fallback_amount,
            budget_amount: None,
            amount_spent: None,
            percent_used: None,
            tier: None,
            bitrate_bps: None,
            last_updated: None,
            budget_source: None,
            error: None,
        }
    }

    fn from_state(config: &CostgateConfig, persisted: PersistedState) -> Self {
        let mut view = Self::empty(config, StateAvailability::Present);
        if !persisted.budget_name.is_empty() {
            view.budget_name = persisted.budget_name;
        }
        view.budget_amount = Some(persisted.budget_amount);
        view.amount_spent = persisted.amount_spent;
        view.percent_used = Some(persisted.last_percent_used);
        view.tier = Some(persisted.last_tier);
        view.bitrate_bps = Some(persisted.last_bitrate_bps);
        view.last_updated = Some(persisted.last_updated);
        view.budget_source = Some(persisted.budget_source);
        view
    }
}

/// Collect the status view from config and the state file.
pub fn build_status(config: &CostgateConfig) -> StatusView {
    let store = StateStore::new(&config.runner.state_path);
    match store.try_load() {
        Ok(Some(persisted)) => StatusView::from_state(config, persisted),
        Ok(None) => StatusView::empty(config, StateAvailability::Missing),
        Err(e) => {
            let mut view = StatusView::empty(config, StateAvailability::Unreadable);
            view.error = Some(e.to_string());
            view
        }
    }
}

fn format_bitrate(bps: u64) -> String {
    if bps == 0 {
        "remote streaming disabled".to_string()
    } else {
        format!("{:.1} Mbps", bps as f64 / 1_000_000.0)
    }
}

/// Format status as a table
pub fn format_status_table(view: &StatusView) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    table.add_row(vec![Cell::new("Budget"), Cell::new(&view.budget_name)]);
    table.add_row(vec![
        Cell::new("Fallback amount"),
        Cell::new(format!("${:.2}", view.fallback_amount)),
    ]);

    match view.state {
        StateAvailability::Present => {
            if let Some(amount) = view.budget_amount {
                table.add_row(vec![
                    Cell::new("Budget amount"),
                    Cell::new(format!("${:.2}", amount)),
                ]);
            }
            let spent = match view.amount_spent {
                Some(spent) => format!("${:.2}", spent),
                None => "unknown".yellow().to_string(),
            };
            table.add_row(vec![Cell::new("Current cost"), Cell::new(spent)]);
            if let Some(percent) = view.percent_used {
                table.add_row(vec![
                    Cell::new("Used"),
                    Cell::new(format!("{:.1}%", percent)),
                ]);
            }
            if let Some(tier) = &view.tier {
                table.add_row(vec![Cell::new("Tier"), Cell::new(tier.bold().to_string())]);
            }
            if let Some(bps) = view.bitrate_bps {
                table.add_row(vec![Cell::new("Bitrate"), Cell::new(format_bitrate(bps))]);
            }
            if let Some(updated) = view.last_updated {
                table.add_row(vec![
                    Cell::new("Last updated"),
                    Cell::new(updated.to_rfc3339()),
                ]);
            }
            if let Some(source) = view.budget_source {
                let source = match source {
                    BudgetSourceKind::Api => "API".green().to_string(),
                    BudgetSourceKind::Fallback => "FALLBACK".yellow().to_string(),
                };
                table.add_row(vec![Cell::new("Budget source"), Cell::new(source)]);
            }
        }
        StateAvailability::Missing => {
            table.add_row(vec![
                Cell::new("State"),
                Cell::new("no state yet".yellow().to_string()),
            ]);
        }
        StateAvailability::Unreadable => {
            let detail = view.error.as_deref().unwrap_or("unknown error");
            table.add_row(vec![
                Cell::new("State"),
                Cell::new(format!("{}: {}", "state unreadable".red(), detail)),
            ]);
        }
    }

    table.add_row(vec![Cell::new("State file"), Cell::new(&view.state_path)]);
    table.to_string()
}

/// Format status as JSON
pub fn format_status_json(view: &StatusView) -> String {
    serde_json::to_string_pretty(view).unwrap_or_default()
}

/// Handle `costgate status` command
pub fn handle_status(args: &StatusArgs) -> String {
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using default configuration", e);
            CostgateConfig::default().with_env_overrides()
        }
    };

    let view = build_status(&config);
    if args.json {
        format_status_json(&view)
    } else {
        format_status_table(&view)
    }
}
