//! Throttling tier configuration

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Reserved name of the implicit tier above the last threshold.
pub const DISABLED_TIER: &str = "disabled";

/// One quality tier: applies while usage is at or below `max_percent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub max_percent: f64,
    pub bitrate_bps: u64,
}

/// Ordered tier table.
///
/// # Example
///
/// ```toml
/// [[policy.tiers]]
/// name = "high"
/// max_percent = 50.0
/// bitrate_bps = 4000000
///
/// [[policy.tiers]]
/// name = "medium"
/// max_percent = 90.0
/// bitrate_bps = 1500000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub tiers: Vec<TierConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierConfig {
                    name: "high".to_string(),
                    max_percent: 50.0,
                    bitrate_bps: 4_000_000,
                },
                TierConfig {
                    name: "medium".to_string(),
                    max_percent: 90.0,
                    bitrate_bps: 1_500_000,
                },
            ],
        }
    }
}

impl PolicyConfig {
    /// Reject empty, unordered or ambiguous tier tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::MissingField("policy.tiers".to_string()));
        }

        let mut previous: Option<f64> = None;
        for (i, tier) in self.tiers.iter().enumerate() {
            let name = tier.name.trim();
            if name.is_empty() {
                return Err(invalid(i, "name", "name cannot be empty"));
            }
            if name == DISABLED_TIER {
                return Err(invalid(
                    i,
                    "name",
                    "\"disabled\" is reserved for the implicit final tier",
                ));
            }
            if self.tiers[..i].iter().any(|t| t.name.trim() == name) {
                return Err(invalid(i, "name", &format!("duplicate tier name '{}'", name)));
            }
            if !(0.0..=100.0).contains(&tier.max_percent) {
                return Err(invalid(i, "max_percent", "must be within 0-100"));
            }
            if let Some(prev) = previous {
                if tier.max_percent <= prev {
                    return Err(invalid(
                        i,
                        "max_percent",
                        &format!(
                            "thresholds must be strictly ascending ({} follows {})",
                            tier.max_percent, prev
                        ),
                    ));
                }
            }
            previous = Some(tier.max_percent);
        }

        Ok(())
    }
}

fn invalid(index: usize, field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: format!("policy.tiers[{}].{}", index, field),
        message: message.to_string(),
    }
}
