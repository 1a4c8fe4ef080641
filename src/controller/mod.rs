//! Scheduler/runner: one budget → decision → apply → persist cycle.
//!
//! ```text
//! Idle → FetchingBudget → Deciding → Comparing → Applying → Persisting → Idle
//!                                        │            │
//!                                        │            └─ apply failed → Error → Idle
//!                                        └─ unchanged → Persisting
//! ```
//!
//! Every cycle rebuilds its full context from the budget source and the state
//! file; nothing is carried in memory between cycles. A failed budget fetch
//! degrades to the fallback budget and the cycle continues. A failed apply
//! ends the cycle without persisting, so the next cycle retries.

pub mod lock;

pub use lock::{LockError, RunLock};

use crate::budget::{BudgetSnapshot, BudgetSource};
use crate::media::{ApplyError, MediaServer};
use crate::policy::{decide_with_history, DecisionBasis, QualityDecision, ThresholdPolicy};
use crate::state::{PersistedState, StateStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Steps of a cycle, recorded in order on the [`CycleReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    FetchingBudget,
    Deciding,
    Comparing,
    Applying,
    Persisting,
    /// Terminal for this cycle; the next cycle starts from scratch
    Error,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// New limit pushed and state saved
    Applied { previous_tier: Option<String> },
    /// Decision matched the persisted tier; no remote call, freshness saved
    Unchanged,
    /// Media server update failed; state left untouched
    ApplyFailed { error: ApplyError },
    /// Cycle completed but the state file could not be written
    PersistFailed { applied: bool, error: String },
    /// Decision only; nothing applied or persisted
    DryRun { would_apply: bool },
}

impl CycleOutcome {
    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Applied { .. } => "applied",
            CycleOutcome::Unchanged => "unchanged",
            CycleOutcome::ApplyFailed { .. } => "apply_failed",
            CycleOutcome::PersistFailed { .. } => "persist_failed",
            CycleOutcome::DryRun { .. } => "dry_run",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CycleOutcome::Applied { .. } | CycleOutcome::Unchanged | CycleOutcome::DryRun { .. }
        )
    }
}

/// Everything a cycle observed and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub snapshot: BudgetSnapshot,
    pub decision: QualityDecision,
    pub outcome: CycleOutcome,
    pub states: Vec<CycleState>,
}

/// Runs cycles against a budget source and a media server.
pub struct Controller {
    budget: Arc<dyn BudgetSource>,
    media: Arc<dyn MediaServer>,
    policy: ThresholdPolicy,
    store: StateStore,
    dry_run: bool,
}

impl Controller {
    pub fn new(
        budget: Arc<dyn BudgetSource>,
        media: Arc<dyn MediaServer>,
        policy: ThresholdPolicy,
        store: StateStore,
    ) -> Self {
        Self {
            budget,
            media,
            policy,
            store,
            dry_run: false,
        }
    }

    /// Decide and report without applying or persisting.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full cycle to completion.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);
        let report = self.execute(cycle_id).instrument(span).await;
        crate::metrics::record_cycle(report.outcome.label());
        report
    }

    async fn execute(&self, cycle_id: Uuid) -> CycleReport {
        let mut states = vec![CycleState::Idle];
        let prior = self.store.load();

        states.push(CycleState::FetchingBudget);
        let snapshot = self.budget.fetch_budget().await;

        states.push(CycleState::Deciding);
        let decision = decide_with_history(
            &snapshot,
            &self.policy,
            prior.as_ref().map(|p| p.last_percent_used),
        );
        log_decision(&snapshot, &decision);
        crate::metrics::record_decision(&snapshot, &decision);

        states.push(CycleState::Comparing);
        let unchanged = prior.as_ref().is_some_and(|p| p.matches(&decision));
        let previous_tier = prior.map(|p| p.last_tier);

        let finish = |outcome: CycleOutcome, mut states: Vec<CycleState>| {
            states.push(CycleState::Idle);
            CycleReport {
                cycle_id,
                snapshot: snapshot.clone(),
                decision: decision.clone(),
                outcome,
                states,
            }
        };

        if self.dry_run {
            tracing::info!(
                tier = %decision.tier_name,
                bitrate_bps = decision.bitrate_bps,
                would_apply = !unchanged,
                "Dry run, not applying"
            );
            return finish(CycleOutcome::DryRun { would_apply: !unchanged }, states);
        }

        if unchanged {
            tracing::info!(
                tier = %decision.tier_name,
                bitrate_bps = decision.bitrate_bps,
                "Tier unchanged, skipping media server update"
            );
        } else {
            states.push(CycleState::Applying);
            if let Err(error) = self.media.apply_limit(decision.bitrate_bps).await {
                tracing::error!(
                    server = self.media.name(),
                    tier = %decision.tier_name,
                    bitrate_bps = decision.bitrate_bps,
                    error = %error,
                    "Failed to apply bitrate limit, will retry next cycle"
                );
                crate::metrics::record_apply_failure();
                states.push(CycleState::Error);
                return finish(CycleOutcome::ApplyFailed { error }, states);
            }
            tracing::info!(
                server = self.media.name(),
                from = previous_tier.as_deref().unwrap_or("none"),
                to = %decision.tier_name,
                bitrate_bps = decision.bitrate_bps,
                "Applied new bitrate limit"
            );
        }

        states.push(CycleState::Persisting);
        let state = PersistedState::from_decision(&decision, &snapshot, Utc::now());
        let outcome = match self.store.save(&state) {
            Ok(()) if unchanged => CycleOutcome::Unchanged,
            Ok(()) => CycleOutcome::Applied { previous_tier },
            Err(e) => {
                tracing::error!(
                    path = %self.store.path().display(),
                    error = %e,
                    "Failed to persist state"
                );
                CycleOutcome::PersistFailed {
                    applied: !unchanged,
                    error: e.to_string(),
                }
            }
        };

        finish(outcome, states)
    }

    /// Run a cycle now and then every `interval` until cancelled.
    ///
    /// Cycles run sequentially on one task and never overlap; a tick missed
    /// because a cycle overran is skipped, not queued.
    pub fn start(self, interval: Duration, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                interval_seconds = interval.as_secs(),
                budget_source = self.budget.name(),
                media_server = self.media.name(),
                "Controller started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Controller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.run_cycle().await;
                        tracing::debug!(
                            cycle_id = %report.cycle_id,
                            outcome = report.outcome.label(),
                            "Cycle completed"
                        );
                    }
                }
            }
        })
    }
}

fn log_decision(snapshot: &BudgetSnapshot, decision: &QualityDecision) {
    match decision.basis {
        DecisionBasis::UnknownSpendMostRestrictive => tracing::warn!(
            budget = %snapshot.budget_name,
            "Spend unknown, selecting most restrictive tier"
        ),
        DecisionBasis::UnknownSpendReusedLast => tracing::warn!(
            budget = %snapshot.budget_name,
            percent_used = decision.percent_used,
            "Spend unknown, reusing last known usage"
        ),
        DecisionBasis::NonPositiveBudget => tracing::warn!(
            budget = %snapshot.budget_name,
            budget_amount = snapshot.budget_amount,
            "Budget amount not positive, selecting most restrictive tier"
        ),
        DecisionBasis::Measured => {}
    }

    tracing::info!(
        budget = %snapshot.budget_name,
        source = %snapshot.source,
        budget_amount = snapshot.budget_amount,
        amount_spent = snapshot.amount_spent(),
        percent_used = %format_args!("{:.1}", decision.percent_used),
        tier = %decision.tier_name,
        bitrate_bps = decision.bitrate_bps,
        "Decided quality tier"
    );
}
