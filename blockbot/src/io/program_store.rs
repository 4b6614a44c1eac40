//! Program files: a top-level command sequence plus its function library.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::invariants::validate_program;
use crate::program::{Command, Function};

/// On-disk program snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramFile {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

/// Load a program file and check id uniqueness.
pub fn load_program(path: &Path) -> Result<ProgramFile> {
    debug!(path = %path.display(), "loading program");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read program {}", path.display()))?;
    let program: ProgramFile = serde_json::from_str(&contents)
        .with_context(|| format!("parse program {}", path.display()))?;
    validate(&program).with_context(|| format!("validate program {}", path.display()))?;
    debug!(
        commands = program.commands.len(),
        functions = program.functions.len(),
        "program loaded"
    );
    Ok(program)
}

/// Write a program file with stable pretty formatting.
pub fn write_program(path: &Path, program: &ProgramFile) -> Result<()> {
    validate(program)?;
    let mut buf = serde_json::to_string_pretty(program).context("serialize program")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

fn validate(program: &ProgramFile) -> Result<()> {
    let errors = validate_program(&program.commands, &program.functions);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("program invariants failed: {}", errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call, function, looped, mv, turn};

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("program.json");
        let program = ProgramFile {
            commands: vec![looped("l", 2, vec![mv("m"), turn("t")]), call("k", "fn-1")],
            functions: vec![function("fn-1", vec![mv("f")])],
        };
        write_program(&path, &program).expect("write");
        assert_eq!(load_program(&path).expect("load"), program);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("program.json");
        fs::write(
            &path,
            r#"{"commands": [{"kind": "move", "id": "a"}, {"kind": "move", "id": "a"}]}"#,
        )
        .expect("write");
        let err = load_program(&path).expect_err("duplicate ids");
        assert!(format!("{err:#}").contains("duplicate node id 'a'"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("program.json");
        fs::write(&path, "{}").expect("write");
        assert_eq!(load_program(&path).expect("load"), ProgramFile::default());
    }
}
