//! Validation helpers for `blockbot validate`.

use std::path::Path;

use anyhow::{Result, anyhow};

use crate::core::invariants::disallowed_kinds;
use crate::io::level_store::load_level_pack_or_default;
use crate::io::program_store::load_program;

/// Program-level validation summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSummary {
    pub commands: usize,
    pub functions: usize,
}

/// High-level validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub levels: usize,
    pub program: Option<ProgramSummary>,
}

/// Validate a level pack (built-in when `pack` is `None`) and optionally a
/// program file.
///
/// With `level_id`, the program must also only use commands that level allows.
pub fn validate_inputs(
    pack: Option<&Path>,
    program: Option<&Path>,
    level_id: Option<&str>,
) -> Result<ValidateOutcome> {
    let pack = load_level_pack_or_default(pack)?;
    let program = match program {
        Some(path) => Some(load_program(path)?),
        None => None,
    };

    if let Some(level_id) = level_id {
        let level = pack
            .find(level_id)
            .ok_or_else(|| anyhow!("unknown level '{level_id}'"))?;
        if let Some(program) = &program {
            let rejected = disallowed_kinds(level, &program.commands, &program.functions);
            if !rejected.is_empty() {
                let names: Vec<&str> = rejected.iter().map(|kind| kind.label()).collect();
                return Err(anyhow!(
                    "level '{level_id}' does not allow: {}",
                    names.join(", ")
                ));
            }
        }
    }

    Ok(ValidateOutcome {
        levels: pack.levels.len(),
        program: program.map(|program| ProgramSummary {
            commands: program.commands.len(),
            functions: program.functions.len(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn built_in_pack_validates_without_program() {
        let outcome = validate_inputs(None, None, None).expect("validate");
        assert_eq!(
            outcome,
            ValidateOutcome {
                levels: 5,
                program: None
            }
        );
    }

    #[test]
    fn program_summary_counts_top_level_items() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("program.json");
        fs::write(
            &path,
            r#"{"commands": [{"kind": "move", "id": "a"}, {"kind": "call", "id": "c", "function_id": "fn-1"}],
                "functions": [{"id": "fn-1", "name": "hop", "body": [{"kind": "move", "id": "b"}]}]}"#,
        )
        .expect("write");

        let outcome = validate_inputs(None, Some(&path), Some("staircase")).expect("validate");
        assert_eq!(
            outcome.program,
            Some(ProgramSummary {
                commands: 2,
                functions: 1
            })
        );
    }

    #[test]
    fn rejects_commands_the_level_forbids() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("program.json");
        fs::write(
            &path,
            r#"{"commands": [{"kind": "loop", "id": "l", "times": 2, "children": [{"kind": "move", "id": "m"}]}]}"#,
        )
        .expect("write");

        let err = validate_inputs(None, Some(&path), Some("first-steps")).expect_err("loop");
        assert!(err.to_string().contains("does not allow: loop"));
    }

    #[test]
    fn unknown_level_is_an_error() {
        let err = validate_inputs(None, None, Some("nope")).expect_err("unknown");
        assert!(err.to_string().contains("unknown level 'nope'"));
    }
}
