//! Persisted controller state.
//!
//! The state file records the last applied tier and is used purely for change
//! detection and operator status. It is not a source of truth for the media
//! server, whose live configuration may drift independently.
//!
//! Writes go to a temporary file in the same directory, are fsynced, then
//! renamed over the target, so readers only ever observe a complete old or
//! complete new document. On Unix the directory is fsynced after the rename
//! so the new entry survives power loss.

use crate::budget::{BudgetSnapshot, BudgetSourceKind};
use crate::policy::QualityDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// File exists but is not a valid state document
    #[error("state file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Last successfully completed decision.
///
/// Unknown fields are ignored on read; fields added after the first release
/// default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub last_tier: String,
    pub last_bitrate_bps: u64,
    pub last_updated: DateTime<Utc>,
    pub last_percent_used: f64,
    pub budget_source: BudgetSourceKind,
    #[serde(default)]
    pub budget_name: String,
    #[serde(default)]
    pub budget_amount: f64,
    /// `None` when spend was unknown in the recorded cycle
    #[serde(default)]
    pub amount_spent: Option<f64>,
}

impl PersistedState {
    /// Record a decision as of `now`.
    pub fn from_decision(
        decision: &QualityDecision,
        snapshot: &BudgetSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            last_tier: decision.tier_name.clone(),
            last_bitrate_bps: decision.bitrate_bps,
            last_updated: now,
            last_percent_used: decision.percent_used,
            budget_source: snapshot.source,
            budget_name: snapshot.budget_name.clone(),
            budget_amount: snapshot.budget_amount,
            amount_spent: snapshot
                .is_spend_known()
                .then(|| snapshot.amount_spent()),
        }
    }

    /// Whether the decision would leave the remote limit unchanged.
    pub fn matches(&self, decision: &QualityDecision) -> bool {
        self.last_tier == decision.tier_name && self.last_bitrate_bps == decision.bitrate_bps
    }
}

/// JSON state file at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, distinguishing "absent" from "unreadable".
    pub fn try_load(&self) -> Result<Option<PersistedState>, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    /// Read the state; a missing or corrupt file is treated as first run.
    pub fn load(&self) -> Option<PersistedState> {
        match self.try_load() {
            Ok(Some(state)) => Some(state),
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "No prior state, first run");
                None
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file unreadable, treating as first run"
                );
                None
            }
        }
    }

    /// Atomically replace the state file.
    pub fn save(&self, state: &PersistedState) -> Result<(), StateError> {
        let staged = self.stage(state)?;
        self.commit(staged)?;

        tracing::debug!(
            path = %self.path.display(),
            tier = %state.last_tier,
            "Persisted state"
        );
        Ok(())
    }

    /// Write `state` to a synced temp file beside the target. The target is
    /// untouched until [`commit`](Self::commit).
    fn stage(&self, state: &PersistedState) -> Result<StagedWrite, StateError> {
        let serialized = serde_json::to_vec_pretty(state)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        temp.write_all(&serialized).map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        Ok(StagedWrite { temp, dir })
    }

    fn commit(&self, staged: StagedWrite) -> Result<(), StateError> {
        staged
            .temp
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        sync_dir(&staged.dir).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Fully written temp file awaiting rename over the target.
struct StagedWrite {
    temp: NamedTempFile,
    dir: PathBuf,
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
