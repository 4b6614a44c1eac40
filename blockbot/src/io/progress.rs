//! Player progress storage.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted record of solved levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerProgress {
    /// Level the player last worked on.
    pub current_level: Option<String>,
    /// Ids of solved levels.
    pub completed_levels: BTreeSet<String>,
    /// Sum of winning step counts across all recorded wins.
    pub total_steps: u64,
    /// Fewest top-level steps that solved each level.
    pub best_steps: BTreeMap<String, u32>,
}

impl PlayerProgress {
    /// Record a win. Returns true when `steps` is a new best for the level.
    pub fn record_win(&mut self, level_id: &str, steps: u32) -> bool {
        self.current_level = Some(level_id.to_string());
        self.completed_levels.insert(level_id.to_string());
        self.total_steps = self.total_steps.saturating_add(u64::from(steps));
        match self.best_steps.get(level_id) {
            Some(best) if *best <= steps => false,
            _ => {
                self.best_steps.insert(level_id.to_string(), steps);
                true
            }
        }
    }

    pub fn is_completed(&self, level_id: &str) -> bool {
        self.completed_levels.contains(level_id)
    }
}

/// Load progress; a missing file means a fresh player.
pub fn load_progress(path: &Path) -> Result<PlayerProgress> {
    if !path.exists() {
        debug!(path = %path.display(), "no progress file, starting fresh");
        return Ok(PlayerProgress::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read progress {}", path.display()))?;
    let progress: PlayerProgress = serde_json::from_str(&contents)
        .with_context(|| format!("parse progress {}", path.display()))?;
    debug!(
        completed = progress.completed_levels.len(),
        "progress loaded"
    );
    Ok(progress)
}

/// Atomically write progress to disk (temp file + rename).
pub fn write_progress(path: &Path, progress: &PlayerProgress) -> Result<()> {
    debug!(path = %path.display(), completed = progress.completed_levels.len(), "writing progress");
    let mut buf = serde_json::to_string_pretty(progress)?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
