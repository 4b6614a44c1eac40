//! Level pack load/save helpers with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::invariants::validate_pack;
use crate::level::LevelPack;

/// JSON Schema every level pack must satisfy.
pub const LEVEL_PACK_SCHEMA: &str = include_str!("../../schemas/level_pack.schema.json");

const DEFAULT_PACK: &str = include_str!("../../levels/default.json");

/// The pack shipped with the binary.
pub fn default_level_pack() -> Result<LevelPack> {
    parse_level_pack(DEFAULT_PACK).context("parse built-in level pack")
}

/// Load and validate a level pack from disk (schema + invariants).
pub fn load_level_pack(path: &Path) -> Result<LevelPack> {
    debug!(path = %path.display(), "loading level pack");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read level pack {}", path.display()))?;
    let pack = parse_level_pack(&contents)
        .with_context(|| format!("load level pack {}", path.display()))?;
    debug!(levels = pack.levels.len(), "level pack loaded");
    Ok(pack)
}

/// Load `path` when given, otherwise the built-in pack.
pub fn load_level_pack_or_default(path: Option<&Path>) -> Result<LevelPack> {
    match path {
        Some(path) => load_level_pack(path),
        None => default_level_pack(),
    }
}

/// Parse and validate level pack JSON.
pub fn parse_level_pack(raw: &str) -> Result<LevelPack> {
    let value: Value = serde_json::from_str(raw).context("parse level pack json")?;
    validate_schema(&value)?;
    let pack: LevelPack = serde_json::from_value(value).context("deserialize level pack")?;
    validate_pack_invariants(&pack)?;
    Ok(pack)
}

/// Write a level pack with stable pretty formatting.
pub fn write_level_pack(path: &Path, pack: &LevelPack) -> Result<()> {
    validate_pack_invariants(pack)?;
    let mut buf = serde_json::to_string_pretty(pack).context("serialize level pack")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

fn validate_schema(pack: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(LEVEL_PACK_SCHEMA).context("parse level pack schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(pack) {
        let messages = compiled
            .iter_errors(pack)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "level pack schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_pack_invariants(pack: &LevelPack) -> Result<()> {
    let errors = validate_pack(pack);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("level pack invariants failed: {}", errors.join("; ")))
}
