//! Engine State Snapshots
//!
//! Optional persistence for state that should survive a process restart:
//! the performance tracker, risk state, and any open position lifecycle.
//! The engine treats this as plain data; the caller decides when to save
//! and load. Writes go through a sibling temp file and an atomic rename so
//! a crash mid-write never leaves a torn snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::performance::PerformanceTracker;
use super::position::{AdvancedPositionState, Position};
use super::risk::RiskState;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Whether a load found prior state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// No snapshot file existed; start clean
    Fresh,
    /// State restored from disk
    Recovered,
}

/// Everything worth carrying across a restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub saved_at: DateTime<Utc>,
    pub performance: PerformanceTracker,
    pub risk_state: RiskState,
    pub open_position: Option<Position>,
    pub position_state: Option<AdvancedPositionState>,
}

impl EngineSnapshot {
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "engine snapshot saved");
        Ok(())
    }

    /// Load a snapshot if one exists. A missing file is a fresh start,
    /// not an error; a corrupt file is an error.
    pub fn load(path: &Path) -> Result<(Option<EngineSnapshot>, RecoveryStatus), PersistError> {
        if !path.exists() {
            return Ok((None, RecoveryStatus::Fresh));
        }
        let json = fs::read_to_string(path)?;
        let snapshot: EngineSnapshot = serde_json::from_str(&json)?;
        tracing::info!(
            path = %path.display(),
            saved_at = %snapshot.saved_at,
            "engine snapshot recovered"
        );
        Ok((Some(snapshot), RecoveryStatus::Recovered))
    }
}
