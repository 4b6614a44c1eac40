//! Engine configuration stored as TOML (default `blockbot.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::engine::{DEFAULT_MAX_CALL_DEPTH, RunOptions};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "blockbot.toml";

/// Blockbot configuration (TOML).
///
/// Missing fields default to the interactive values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockbotConfig {
    /// Pause after each executed block, in milliseconds. `0` disables pacing.
    pub pacing_ms: u64,

    /// Maximum number of nested function calls before a run fails.
    pub max_call_depth: u32,

    /// Refuse programs whose worst-case execution count exceeds this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_executions: Option<u64>,

    /// Player progress file; progress is not recorded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_path: Option<PathBuf>,
}

impl Default for BlockbotConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 300,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_executions: None,
            progress_path: None,
        }
    }
}

impl BlockbotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(anyhow!("max_call_depth must be > 0"));
        }
        if self.max_executions == Some(0) {
            return Err(anyhow!("max_executions must be > 0 when set"));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_call_depth: self.max_call_depth,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BlockbotConfig::default()`.
pub fn load_config(path: &Path) -> Result<BlockbotConfig> {
    if !path.exists() {
        let cfg = BlockbotConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BlockbotConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BlockbotConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
