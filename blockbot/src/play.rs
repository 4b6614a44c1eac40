//! Orchestration for `blockbot run`: load inputs, run one attempt, record
//! progress.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::engine::{ExecutionObserver, ExecutionResult, ExecutionTrace};
use crate::core::types::RobotState;
use crate::io::config::BlockbotConfig;
use crate::io::program_store::ProgramFile;
use crate::io::progress::{load_progress, write_progress};
use crate::level::LevelPack;
use crate::session::{RunDecision, Session, SessionOptions};

/// Everything the CLI reports about one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayOutcome {
    pub level_id: String,
    pub result: ExecutionResult,
    pub trace: ExecutionTrace,
    pub final_state: RobotState,
    /// Level that follows a win, if the pack has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_level: Option<String>,
    /// True when the win beat the recorded best for this level.
    pub new_best: bool,
}

impl PlayOutcome {
    pub fn won(&self) -> bool {
        self.result.success
    }
}

/// Run `program` on `level_id` and, on a win with `progress_path` set,
/// persist the player's progress.
pub fn play_level<O: ExecutionObserver + ?Sized>(
    pack: &LevelPack,
    level_id: &str,
    program: ProgramFile,
    config: &BlockbotConfig,
    progress_path: Option<&Path>,
    observer: &mut O,
) -> Result<PlayOutcome> {
    let level = pack
        .find(level_id)
        .ok_or_else(|| anyhow!("unknown level '{level_id}'"))?
        .clone();
    let options = SessionOptions {
        run: config.run_options(),
        max_executions: config.max_executions,
    };

    let mut session = Session::new(level, options);
    session.load_program(program.commands, program.functions);
    let decision = session
        .run_current(observer)
        .with_context(|| format!("run level '{level_id}'"))?;

    let result = session
        .last_result()
        .cloned()
        .ok_or_else(|| anyhow!("run finished without a result"))?;

    let mut new_best = false;
    let mut next_level = None;
    if let RunDecision::Won { steps } = decision {
        next_level = pack.next_after(level_id).map(|level| level.id.clone());
        if let Some(path) = progress_path {
            let mut progress = load_progress(path)?;
            new_best = progress.record_win(level_id, steps);
            if let Some(next) = &next_level {
                progress.current_level = Some(next.clone());
            }
            write_progress(path, &progress)?;
            debug!(path = %path.display(), new_best, "progress recorded");
        }
    }
    info!(level = level_id, success = result.success, steps = result.steps, "attempt finished");

    Ok(PlayOutcome {
        level_id: level_id.to_string(),
        result,
        trace: session.trace().clone(),
        final_state: *session.robot(),
        next_level,
        new_best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::NoopObserver;
    use crate::io::level_store::default_level_pack;
    use crate::io::progress::PlayerProgress;
    use crate::test_support::{mv, turn};

    fn quiet_config() -> BlockbotConfig {
        BlockbotConfig {
            pacing_ms: 0,
            ..BlockbotConfig::default()
        }
    }

    fn program(commands: Vec<crate::program::Command>) -> ProgramFile {
        ProgramFile {
            commands,
            functions: Vec::new(),
        }
    }

    #[test]
    fn win_records_progress_and_points_to_next_level() {
        let temp = tempfile::tempdir().expect("tempdir");
        let progress_path = temp.path().join("progress.json");
        let pack = default_level_pack().expect("pack");

        let outcome = play_level(
            &pack,
            "first-steps",
            program(vec![mv("a"), mv("b"), mv("c")]),
            &quiet_config(),
            Some(&progress_path),
            &mut NoopObserver,
        )
        .expect("play");

        assert!(outcome.won());
        assert_eq!(outcome.result.steps, 3);
        assert_eq!(outcome.next_level.as_deref(), Some("turn-the-corner"));
        assert!(outcome.new_best);

        let progress = load_progress(&progress_path).expect("load");
        assert!(progress.is_completed("first-steps"));
        assert_eq!(progress.current_level.as_deref(), Some("turn-the-corner"));
    }

    #[test]
    fn loss_leaves_progress_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let progress_path = temp.path().join("progress.json");
        let pack = default_level_pack().expect("pack");

        let outcome = play_level(
            &pack,
            "first-steps",
            program(vec![mv("a")]),
            &quiet_config(),
            Some(&progress_path),
            &mut NoopObserver,
        )
        .expect("play");

        assert!(!outcome.won());
        assert!(outcome.result.is_goal_not_reached());
        assert_eq!(outcome.next_level, None);
        assert!(!progress_path.exists());
        assert_eq!(
            load_progress(&progress_path).expect("load"),
            PlayerProgress::default()
        );
    }

    #[test]
    fn empty_program_is_a_loss_not_an_error() {
        let pack = default_level_pack().expect("pack");
        let outcome = play_level(
            &pack,
            "first-steps",
            ProgramFile::default(),
            &quiet_config(),
            None,
            &mut NoopObserver,
        )
        .expect("play");
        assert!(!outcome.won());
        assert_eq!(outcome.result.steps, 0);
        assert!(outcome.trace.is_empty());
    }

    #[test]
    fn disallowed_command_is_an_error() {
        let pack = default_level_pack().expect("pack");
        let err = play_level(
            &pack,
            "first-steps",
            program(vec![turn("t")]),
            &quiet_config(),
            None,
            &mut NoopObserver,
        )
        .expect_err("turn not allowed");
        assert!(format!("{err:#}").contains("not available in level 'first-steps'"));
    }

    #[test]
    fn unknown_level_is_an_error() {
        let pack = default_level_pack().expect("pack");
        let err = play_level(
            &pack,
            "missing",
            ProgramFile::default(),
            &quiet_config(),
            None,
            &mut NoopObserver,
        )
        .expect_err("unknown");
        assert!(err.to_string().contains("unknown level 'missing'"));
    }
}
