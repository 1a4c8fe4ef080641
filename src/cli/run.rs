//! Run and daemon command implementations

use crate::budget::AzureBudgetSource;
use crate::cli::{DaemonArgs, RunArgs};
use crate::config::CostgateConfig;
use crate::controller::{Controller, CycleReport, LockError, RunLock};
use crate::media::JellyfinServer;
use crate::policy::ThresholdPolicy;
use crate::state::StateStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Load configuration: file (if present), then environment overrides.
pub fn load_config(path: &Path) -> Result<CostgateConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        CostgateConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        CostgateConfig::default()
    };

    Ok(config.with_env_overrides())
}

/// Wire the Azure budget source and Jellyfin adapter into a controller.
///
/// A dry run never calls the media server, so a missing API key is tolerated.
pub fn build_controller(
    config: &CostgateConfig,
    dry_run: bool,
) -> Result<Controller, Box<dyn std::error::Error>> {
    let api_key = match config.media_server.api_key() {
        Ok(key) => key,
        Err(e) if dry_run => {
            tracing::warn!(error = %e, "No media server API key, continuing dry run");
            String::new()
        }
        Err(e) => return Err(e.into()),
    };

    let policy = ThresholdPolicy::from_config(&config.policy, &config.budget)?;
    let budget = AzureBudgetSource::new(config.budget.clone())?;
    let media = JellyfinServer::new(&config.media_server, api_key)?;
    let store = StateStore::new(&config.runner.state_path);

    Ok(Controller::new(Arc::new(budget), Arc::new(media), policy, store).with_dry_run(dry_run))
}

fn log_report(report: &CycleReport) {
    tracing::info!(
        cycle_id = %report.cycle_id,
        outcome = report.outcome.label(),
        tier = %report.decision.tier_name,
        bitrate_bps = report.decision.bitrate_bps,
        budget_source = %report.snapshot.source,
        "Cycle finished"
    );
}

/// Handle `costgate run`
///
/// Cycle failures are logged and retried by the next trigger; only
/// configuration and startup errors fail the process.
pub async fn run_once(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;
    crate::logging::init_tracing(&config.logging)?;

    let _lock = if args.dry_run {
        None
    } else {
        match RunLock::acquire(&config.runner.lock_path) {
            Ok(lock) => Some(lock),
            Err(LockError::AlreadyRunning(path)) => {
                tracing::warn!(
                    lock_path = %path.display(),
                    "Another cycle is in progress, skipping"
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    };

    let controller = build_controller(&config, args.dry_run)?;
    let report = controller.run_cycle().await;
    log_report(&report);

    Ok(())
}

/// Handle `costgate daemon`
pub async fn run_daemon(args: DaemonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(interval) = args.interval {
        config.runner.interval_seconds = interval;
    }
    config.validate()?;
    crate::logging::init_tracing(&config.logging)?;

    let _lock = RunLock::acquire(&config.runner.lock_path)?;

    if config.metrics.enabled {
        crate::metrics::setup_exporter(&config.metrics)?;
    }

    let controller = build_controller(&config, false)?;
    let cancel_token = CancellationToken::new();
    let handle = controller.start(
        Duration::from_secs(config.runner.interval_seconds),
        cancel_token.clone(),
    );

    shutdown_signal(cancel_token).await?;
    handle.await?;

    tracing::info!("costgate stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel the controller loop.
async fn shutdown_signal(cancel_token: CancellationToken) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT, shutting down...");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received SIGINT, shutting down...");
    }

    cancel_token.cancel();
    Ok(())
}
