//! Policy engine: maps budget utilization to a quality tier.
//!
//! Tiers are an ascending list of inclusive upper bounds. Usage exactly at a
//! bound selects the lower (less restrictive) tier; anything above the last
//! bound selects the implicit `disabled` tier with bitrate 0.
//!
//! ```rust
//! use costgate::budget::{BudgetSnapshot, Spend};
//! use costgate::config::{BudgetConfig, PolicyConfig};
//! use costgate::policy::{decide, ThresholdPolicy};
//!
//! let policy = ThresholdPolicy::from_config(&PolicyConfig::default(), &BudgetConfig::default()).unwrap();
//! let snapshot = BudgetSnapshot::from_api("bandwidth".to_string(), 150.0, Spend::Known(50.0));
//! let decision = decide(&snapshot, &policy);
//! assert_eq!(decision.tier_name, "high");
//! assert_eq!(decision.bitrate_bps, 4_000_000);
//! ```

use crate::budget::{BudgetSnapshot, Spend};
use crate::config::{BudgetConfig, ConfigError, PolicyConfig, UnknownSpendPolicy, DISABLED_TIER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named quality level with a fixed bitrate cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    /// Inclusive upper bound on percent used; `f64::INFINITY` for `disabled`
    pub max_percent: f64,
    pub bitrate_bps: u64,
}

/// Validated, immutable tier table.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    tiers: Vec<Tier>,
    disabled: Tier,
    unknown_spend: UnknownSpendPolicy,
}

impl ThresholdPolicy {
    /// Build from configuration; fails on unordered or ambiguous tiers.
    pub fn from_config(policy: &PolicyConfig, budget: &BudgetConfig) -> Result<Self, ConfigError> {
        policy.validate()?;

        let tiers = policy
            .tiers
            .iter()
            .map(|t| Tier {
                name: t.name.trim().to_string(),
                max_percent: t.max_percent,
                bitrate_bps: t.bitrate_bps,
            })
            .collect();

        Ok(Self {
            tiers,
            disabled: Tier {
                name: DISABLED_TIER.to_string(),
                max_percent: f64::INFINITY,
                bitrate_bps: 0,
            },
            unknown_spend: budget.unknown_spend,
        })
    }

    /// Configured tiers, ascending (excludes the implicit `disabled` tier).
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn unknown_spend(&self) -> UnknownSpendPolicy {
        self.unknown_spend
    }

    /// The implicit final tier.
    pub fn most_restrictive(&self) -> &Tier {
        &self.disabled
    }

    /// First tier whose bound is `>= percent_used`, else `disabled`.
    pub fn select(&self, percent_used: f64) -> &Tier {
        if percent_used.is_nan() {
            return &self.disabled;
        }
        self.tiers
            .iter()
            .find(|t| t.max_percent >= percent_used)
            .unwrap_or(&self.disabled)
    }
}

/// How the percentage behind a decision was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
    /// spent / budget
    Measured,
    /// Budget amount was not positive (or too small to measure against); forced to 100%
    NonPositiveBudget,
    /// Spend unknown; forced to 100%
    UnknownSpendMostRestrictive,
    /// Spend unknown; reused the last persisted percentage
    UnknownSpendReusedLast,
}

/// Output of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDecision {
    pub tier_name: String,
    pub bitrate_bps: u64,
    pub percent_used: f64,
    pub basis: DecisionBasis,
    pub decided_at: DateTime<Utc>,
}

/// Decimal places kept in a measured percentage.
///
/// Currency amounts are decimal, so `100 * 9.63 / 10.70` lands a few ulps
/// above 90 in binary floating point. Rounding here puts such values back on
/// the boundary so the inclusive comparison in [`ThresholdPolicy::select`]
/// holds for thresholds with up to this many decimals.
const PERCENT_SCALE: f64 = 1e9;

/// `100 * spent / budget`, forced to 100 when the budget is not positive or
/// the ratio overflows.
pub fn percent_used(amount_spent: f64, budget_amount: f64) -> f64 {
    measured_percent(amount_spent, budget_amount).unwrap_or(100.0)
}

/// Finite, boundary-rounded percentage, or `None` when it cannot be measured.
fn measured_percent(amount_spent: f64, budget_amount: f64) -> Option<f64> {
    if !is_positive(budget_amount) {
        return None;
    }
    let percent = (100.0 * amount_spent / budget_amount * PERCENT_SCALE).round() / PERCENT_SCALE;
    percent.is_finite().then_some(percent)
}

fn is_positive(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}

/// Decide the tier for a snapshot with no history.
///
/// Unknown spend always resolves to the most restrictive tier here.
pub fn decide(snapshot: &BudgetSnapshot, policy: &ThresholdPolicy) -> QualityDecision {
    decide_with_history(snapshot, policy, None)
}

/// Decide the tier, consulting the last persisted percentage when spend is
/// unknown and the policy says to reuse it.
///
/// Pure: the decision timestamp is the snapshot's observation time.
pub fn decide_with_history(
    snapshot: &BudgetSnapshot,
    policy: &ThresholdPolicy,
    last_percent_used: Option<f64>,
) -> QualityDecision {
    let (percent, basis) = match snapshot.spend {
        _ if !is_positive(snapshot.budget_amount) => (100.0, DecisionBasis::NonPositiveBudget),
        // A vanishingly small budget overflows the ratio; treat it like no budget
        Spend::Known(spent) => match measured_percent(spent, snapshot.budget_amount) {
            Some(percent) => (percent, DecisionBasis::Measured),
            None => (100.0, DecisionBasis::NonPositiveBudget),
        },
        Spend::Unknown => match (policy.unknown_spend, last_percent_used) {
            (UnknownSpendPolicy::ReuseLast, Some(last)) if last.is_finite() => {
                (last, DecisionBasis::UnknownSpendReusedLast)
            }
            _ => (100.0, DecisionBasis::UnknownSpendMostRestrictive),
        },
    };

    let tier = match basis {
        DecisionBasis::NonPositiveBudget | DecisionBasis::UnknownSpendMostRestrictive => {
            policy.most_restrictive()
        }
        _ => policy.select(percent),
    };

    QualityDecision {
        tier_name: tier.name.clone(),
        bitrate_bps: tier.bitrate_bps,
        percent_used: percent,
        basis,
        decided_at: snapshot.observed_at,
    }
}
