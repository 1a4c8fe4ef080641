//! Budget source: current budget amount and month-to-date spend.
//!
//! A [`BudgetSource`] never fails. When the cost API is unreachable, rejects
//! the identity, or has no usable budget, the source returns a snapshot with
//! [`BudgetSourceKind::Fallback`] carrying the configured static amount and
//! whatever spend figure could still be read.

pub mod azure;
pub mod error;

pub use azure::AzureBudgetSource;
pub use error::BudgetError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a snapshot's budget amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetSourceKind {
    /// Live budget from the cost API
    Api,
    /// Statically configured fallback amount
    Fallback,
}

impl fmt::Display for BudgetSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetSourceKind::Api => write!(f, "API"),
            BudgetSourceKind::Fallback => write!(f, "FALLBACK"),
        }
    }
}

/// Month-to-date spend as observed by the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Spend {
    Known(f64),
    /// Spend could not be read; must not be treated as zero usage.
    Unknown,
}

impl Spend {
    // Refunds can push month-to-date cost below zero.
    fn clamped(self) -> Self {
        match self {
            Spend::Known(amount) if amount.is_finite() => Spend::Known(amount.max(0.0)),
            Spend::Known(_) => Spend::Unknown,
            Spend::Unknown => Spend::Unknown,
        }
    }
}

/// One poll's worth of (spend, budget) data. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub budget_name: String,
    pub budget_amount: f64,
    pub spend: Spend,
    pub source: BudgetSourceKind,
    /// Reason code when `source` is `Fallback`
    pub fallback_reason: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl BudgetSnapshot {
    /// Snapshot backed by a live budget.
    pub fn from_api(budget_name: String, budget_amount: f64, spend: Spend) -> Self {
        Self {
            budget_name,
            budget_amount,
            spend: spend.clamped(),
            source: BudgetSourceKind::Api,
            fallback_reason: None,
            observed_at: Utc::now(),
        }
    }

    /// Snapshot using the static fallback amount.
    pub fn fallback(
        budget_name: String,
        fallback_amount: f64,
        spend: Spend,
        reason: &BudgetError,
    ) -> Self {
        Self {
            budget_name,
            budget_amount: fallback_amount,
            spend: spend.clamped(),
            source: BudgetSourceKind::Fallback,
            fallback_reason: Some(reason.reason_code().to_string()),
            observed_at: Utc::now(),
        }
    }

    /// Spend in budget currency; `0.0` when unknown (check [`Self::is_spend_known`]).
    pub fn amount_spent(&self) -> f64 {
        match self.spend {
            Spend::Known(amount) => amount,
            Spend::Unknown => 0.0,
        }
    }

    pub fn is_spend_known(&self) -> bool {
        matches!(self.spend, Spend::Known(_))
    }
}

/// Supplier of budget snapshots.
#[async_trait]
pub trait BudgetSource: Send + Sync {
    /// Fetch the current budget. Failures degrade to a fallback snapshot.
    async fn fetch_budget(&self) -> BudgetSnapshot;

    /// Name for logging
    fn name(&self) -> &str;
}
