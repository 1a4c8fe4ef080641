//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scheduling and on-disk locations for the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds between cycles in daemon mode
    pub interval_seconds: u64,
    /// Persisted state file (JSON)
    pub state_path: PathBuf,
    /// Single-instance lock file
    pub lock_path: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            state_path: PathBuf::from("/var/lib/costgate/state.json"),
            lock_path: PathBuf::from("/var/lib/costgate/costgate.lock"),
        }
    }
}
