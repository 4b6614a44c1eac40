//! Orchestration for one level attempt.
//!
//! A session owns the editable program, the function library, and the state
//! shown to the player. Runs happen in three phases so the engine never
//! borrows the session: [`Session::begin_run`] checks preconditions and
//! snapshots inputs, [`PendingRun::execute`] interprets, and
//! [`Session::finish_run`] publishes the outcome.

use tracing::{debug, info, warn};

use crate::core::budget::estimate_executions;
use crate::core::engine::{
    ExecutionObserver, ExecutionResult, ExecutionTrace, RunOptions, RunReport, run,
};
use crate::core::invariants::disallowed_kinds;
use crate::core::tree_edit::{self, CommandPatch};
use crate::core::types::{CommandKind, RobotState};
use crate::level::Level;
use crate::program::{Command, Function, IdGenerator, default_function_name};

pub const EMPTY_PROGRAM_MESSAGE: &str = "Add at least one command!";

/// Why a run could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a run is already in progress")]
    RunInProgress,
    #[error("no commands to run")]
    EmptyProgram,
    #[error("command '{kind}' is not available in level '{level_id}'")]
    DisallowedCommand { kind: CommandKind, level_id: String },
    #[error("program may execute {estimate} blocks, over the limit of {limit}")]
    BudgetExceeded { estimate: u64, limit: u64 },
}

/// What the player should do after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    /// Goal reached; the level may advance.
    Won { steps: u32 },
    /// Edit the program and try again.
    Retry,
}

/// Session-wide run settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub run: RunOptions,
    /// Ceiling on the worst-case number of executed blocks.
    pub max_executions: Option<u64>,
}

/// Inputs frozen at `begin_run`. Executing it borrows nothing from the session.
#[derive(Debug, Clone)]
pub struct PendingRun {
    program: Vec<Command>,
    functions: Vec<Function>,
    level: Level,
    initial: RobotState,
    options: RunOptions,
}

impl PendingRun {
    pub fn execute<O: ExecutionObserver + ?Sized>(&self, observer: &mut O) -> RunReport {
        run(
            &self.program,
            &self.functions,
            &self.level,
            self.initial,
            &self.options,
            observer,
        )
    }
}

/// State of one level attempt.
#[derive(Debug, Clone)]
pub struct Session {
    level: Level,
    options: SessionOptions,
    program: Vec<Command>,
    functions: Vec<Function>,
    robot: RobotState,
    trace: ExecutionTrace,
    executing: bool,
    last_result: Option<ExecutionResult>,
    ids: IdGenerator,
}

impl Session {
    pub fn new(level: Level, options: SessionOptions) -> Self {
        let robot = level.start_state();
        Self {
            level,
            options,
            program: Vec::new(),
            functions: Vec::new(),
            robot,
            trace: ExecutionTrace::new(),
            executing: false,
            last_result: None,
            ids: IdGenerator::new(),
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn robot(&self) -> &RobotState {
        &self.robot
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    pub fn program(&self) -> &[Command] {
        &self.program
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Replace program and library wholesale (e.g. after loading a file).
    pub fn load_program(&mut self, program: Vec<Command>, functions: Vec<Function>) {
        self.program = program;
        self.functions = functions;
    }

    // --- editing -----------------------------------------------------------

    /// Fresh block of `kind` with a unique id and palette defaults.
    ///
    /// New `Call` blocks point at the first function, if any.
    pub fn new_command(&self, kind: CommandKind) -> Command {
        let id = self.ids.command_id(&self.program, &self.functions);
        let target = self
            .functions
            .first()
            .map(|function| function.id.as_str())
            .unwrap_or_default();
        Command::with_defaults(kind, id, target)
    }

    /// Append a block to the top-level program.
    pub fn push_command(&mut self, command: Command) {
        self.program.push(command);
    }

    /// Append a block inside the container `parent_id`, searching the program
    /// and every function body.
    pub fn add_child(&mut self, parent_id: &str, command: Command) {
        self.program = tree_edit::add_child(&self.program, parent_id, command.clone());
        for function in &mut self.functions {
            function.body = tree_edit::add_child(&function.body, parent_id, command.clone());
        }
    }

    pub fn update_command(&mut self, command_id: &str, patch: &CommandPatch) {
        self.program = tree_edit::update_node(&self.program, command_id, patch);
        for function in &mut self.functions {
            function.body = tree_edit::update_node(&function.body, command_id, patch);
        }
    }

    pub fn remove_command(&mut self, command_id: &str) {
        self.program = tree_edit::remove_node(&self.program, command_id);
        for function in &mut self.functions {
            function.body = tree_edit::remove_node(&function.body, command_id);
        }
    }

    /// Reparent a block within the tree that holds it: the program or one
    /// function body (see [`tree_edit::move_node`]). `None` moves it to the
    /// top level of that tree. Moves across trees are ignored.
    pub fn move_command(&mut self, command_id: &str, new_parent_id: Option<&str>) {
        self.program = tree_edit::move_node(&self.program, command_id, new_parent_id);
        for function in &mut self.functions {
            function.body = tree_edit::move_node(&function.body, command_id, new_parent_id);
        }
    }

    pub fn clear_program(&mut self) {
        self.program.clear();
    }

    /// Create an empty function named after its position; returns its id.
    pub fn create_function(&mut self) -> String {
        let id = self.ids.function_id(&self.functions);
        let position = self.functions.len() + 1;
        self.functions.push(Function::new(id.clone(), position));
        debug!(function_id = %id, name = %default_function_name(position), "function created");
        id
    }

    pub fn rename_function(&mut self, function_id: &str, name: &str) {
        if let Some(function) = self.functions.iter_mut().find(|f| f.id == function_id) {
            function.name = name.to_string();
        }
    }

    /// Append a block to the top level of a function body.
    pub fn push_function_command(&mut self, function_id: &str, command: Command) {
        if let Some(function) = self.functions.iter_mut().find(|f| f.id == function_id) {
            function.body.push(command);
        }
    }

    /// Delete a function and every call to it, everywhere.
    pub fn delete_function(&mut self, function_id: &str) {
        let (program, functions) =
            tree_edit::delete_function(&self.program, &self.functions, function_id);
        self.program = program;
        self.functions = functions;
        debug!(function_id, "function deleted");
    }

    // --- running -----------------------------------------------------------

    /// Check preconditions and freeze the inputs of a run.
    ///
    /// Clears the trace and marks the session as executing.
    pub fn begin_run(&mut self, program: &[Command]) -> Result<PendingRun, SessionError> {
        if self.executing {
            return Err(SessionError::RunInProgress);
        }
        if program.is_empty() {
            return Err(SessionError::EmptyProgram);
        }
        if let Some(kind) = disallowed_kinds(&self.level, program, &self.functions)
            .into_iter()
            .next()
        {
            return Err(SessionError::DisallowedCommand {
                kind,
                level_id: self.level.id.clone(),
            });
        }
        if let Some(limit) = self.options.max_executions {
            let estimate =
                estimate_executions(program, &self.functions, self.options.run.max_call_depth);
            if estimate > limit {
                warn!(estimate, limit, "program over execution budget");
                return Err(SessionError::BudgetExceeded { estimate, limit });
            }
        }

        self.executing = true;
        self.trace.clear();
        debug!(level = %self.level.id, commands = program.len(), "run begun");
        Ok(PendingRun {
            program: program.to_vec(),
            functions: self.functions.clone(),
            level: self.level.clone(),
            initial: self.level.start_state(),
            options: self.options.run,
        })
    }

    /// Publish a finished run and decide what happens next.
    pub fn finish_run(&mut self, report: RunReport) -> RunDecision {
        self.executing = false;
        self.robot = report.final_state;
        self.trace = report.trace;
        let decision = if report.result.success {
            RunDecision::Won {
                steps: report.result.steps,
            }
        } else {
            RunDecision::Retry
        };
        info!(level = %self.level.id, ?decision, message = %report.result.message, "run published");
        self.last_result = Some(report.result);
        decision
    }

    /// Forget an in-flight run whose result the caller discarded.
    pub fn abandon_run(&mut self) {
        if self.executing {
            debug!(level = %self.level.id, "run abandoned");
        }
        self.executing = false;
    }

    /// Run `program` to completion.
    ///
    /// An empty program is answered with an unsuccessful result without
    /// invoking the engine. Other precondition failures are errors.
    pub fn run<O: ExecutionObserver + ?Sized>(
        &mut self,
        program: &[Command],
        observer: &mut O,
    ) -> Result<RunDecision, SessionError> {
        let pending = match self.begin_run(program) {
            Ok(pending) => pending,
            Err(SessionError::EmptyProgram) => {
                self.last_result = Some(ExecutionResult::unsuccessful(0, EMPTY_PROGRAM_MESSAGE));
                return Ok(RunDecision::Retry);
            }
            Err(err) => return Err(err),
        };
        let report = pending.execute(observer);
        Ok(self.finish_run(report))
    }

    /// Run the session's own program.
    pub fn run_current<O: ExecutionObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> Result<RunDecision, SessionError> {
        let program = self.program.clone();
        self.run(&program, observer)
    }

    /// Put the robot back at the level start and clear the trace.
    pub fn reset(&mut self) {
        self.robot = self.level.start_state();
        self.trace.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{ExecutionError, NoopObserver};
    use crate::core::tree_edit::references_function;
    use crate::core::types::{Position, Rotation};
    use crate::test_support::{call, corridor_level, looped, mv, walled_level};

    fn session(level: Level) -> Session {
        Session::new(level, SessionOptions::default())
    }

    #[test]
    fn empty_program_reports_no_commands() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let decision = session.run(&[], &mut NoopObserver).expect("run");

        assert_eq!(decision, RunDecision::Retry);
        let result = session.last_result().expect("result");
        assert!(!result.success);
        assert_eq!(result.steps, 0);
        assert_eq!(result.message, EMPTY_PROGRAM_MESSAGE);
        assert!(!session.is_executing());
    }

    #[test]
    fn winning_run_updates_robot_and_trace() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let decision = session
            .run(&[mv("a"), mv("b")], &mut NoopObserver)
            .expect("run");

        assert_eq!(decision, RunDecision::Won { steps: 2 });
        assert_eq!(session.robot().position(), Position::new(2, 0));
        assert!(session.robot().reached_goal);
        assert_eq!(session.trace().len(), 2);
    }

    #[test]
    fn failed_run_keeps_last_good_state_until_reset() {
        let mut session = session(walled_level(4, 1, Position::new(3, 0), &[(2, 0)]));
        let decision = session
            .run(&[mv("a"), mv("b")], &mut NoopObserver)
            .expect("run");

        assert_eq!(decision, RunDecision::Retry);
        assert_eq!(session.robot().position(), Position::new(1, 0));
        let result = session.last_result().expect("result");
        assert_eq!(result.failed_command_id.as_deref(), Some("b"));
        assert_eq!(result.error, Some(ExecutionError::CollisionOrBounds { x: 2, y: 0 }));

        session.reset();
        assert_eq!(*session.robot(), session.level().start_state());
        assert!(session.trace().is_empty());
    }

    #[test]
    fn every_run_starts_from_level_start() {
        let mut session = session(corridor_level(4, 1, Position::new(1, 0)));
        session.run(&[mv("a")], &mut NoopObserver).expect("first");
        let decision = session.run(&[mv("a")], &mut NoopObserver).expect("second");
        assert_eq!(decision, RunDecision::Won { steps: 1 });
        assert_eq!(session.trace().lines(), vec!["Moved to (1, 0)"]);
    }

    #[test]
    fn second_begin_is_rejected_while_in_flight() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let pending = session.begin_run(&[mv("a")]).expect("begin");
        assert!(session.is_executing());
        assert_eq!(
            session.begin_run(&[mv("a")]).expect_err("busy"),
            SessionError::RunInProgress
        );

        let report = pending.execute(&mut NoopObserver);
        assert_eq!(session.finish_run(report), RunDecision::Retry);
        assert!(!session.is_executing());
        assert!(session.begin_run(&[mv("a")]).is_ok());
    }

    #[test]
    fn abandoned_run_frees_the_session() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let pending = session.begin_run(&[mv("a")]).expect("begin");
        drop(pending);
        session.abandon_run();
        assert!(!session.is_executing());
        assert!(session.last_result().is_none());
    }

    #[test]
    fn disallowed_kinds_are_rejected_before_running() {
        let mut level = corridor_level(3, 1, Position::new(2, 0));
        level.allowed_commands = vec![CommandKind::Move];
        let mut session = session(level);

        let err = session
            .run(&[looped("l", 2, vec![mv("m")])], &mut NoopObserver)
            .expect_err("loop not allowed");
        assert_eq!(
            err,
            SessionError::DisallowedCommand {
                kind: CommandKind::Loop,
                level_id: "corridor".to_string()
            }
        );
        assert!(!session.is_executing());
    }

    #[test]
    fn uncalled_function_with_disallowed_kind_does_not_block_run() {
        let mut level = corridor_level(2, 1, Position::new(1, 0));
        level.allowed_commands = vec![CommandKind::Move];
        let mut session = session(level);
        let unused = session.create_function();
        session.push_function_command(&unused, Command::new_turn("t", Rotation::Clockwise));
        session.push_command(mv("a"));

        let decision = session.run_current(&mut NoopObserver).expect("run");
        assert_eq!(decision, RunDecision::Won { steps: 1 });
    }

    #[test]
    fn move_command_reparents_inside_function_body() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let function_id = session.create_function();
        session.push_function_command(&function_id, looped("l", 2, vec![]));
        session.push_function_command(&function_id, mv("m"));
        session.push_command(mv("top"));

        session.move_command("m", Some("l"));
        assert_eq!(
            session.functions()[0].body,
            vec![looped("l", 2, vec![mv("m")])]
        );
        assert_eq!(session.program(), [mv("top")]);

        session.move_command("m", None);
        assert_eq!(
            session.functions()[0].body,
            vec![looped("l", 2, vec![]), mv("m")]
        );
    }

    #[test]
    fn move_command_across_trees_is_ignored() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let function_id = session.create_function();
        session.push_function_command(&function_id, looped("l", 2, vec![]));
        session.push_command(mv("top"));

        session.move_command("top", Some("l"));
        assert_eq!(session.program(), [mv("top")]);
        assert_eq!(session.functions()[0].body, vec![looped("l", 2, vec![])]);
    }

    #[test]
    fn budget_ceiling_rejects_oversized_programs() {
        let options = SessionOptions {
            run: RunOptions::default(),
            max_executions: Some(50),
        };
        let mut session = Session::new(corridor_level(3, 1, Position::new(2, 0)), options);
        let program = vec![looped("outer", 10, vec![looped("inner", 10, vec![mv("m")])])];

        let err = session.run(&program, &mut NoopObserver).expect_err("over budget");
        assert_eq!(err, SessionError::BudgetExceeded { estimate: 111, limit: 50 });
    }

    #[test]
    fn editing_builds_a_runnable_program() {
        let mut session = session(corridor_level(5, 1, Position::new(3, 0)));
        let function_id = session.create_function();
        assert_eq!(session.functions()[0].name, "Function 1");
        session.rename_function(&function_id, "step");

        let step = session.new_command(CommandKind::Move);
        session.push_function_command(&function_id, step);

        let repeat = session.new_command(CommandKind::Loop);
        let repeat_id = repeat.id().expect("id").to_string();
        session.push_command(repeat);
        session.update_command(&repeat_id, &CommandPatch::times(3));
        let call_block = session.new_command(CommandKind::Call);
        session.add_child(&repeat_id, call_block);

        let decision = session.run_current(&mut NoopObserver).expect("run");
        assert_eq!(decision, RunDecision::Won { steps: 1 });
        let lines = session.trace().lines();
        assert_eq!(
            lines[..3],
            ["Loop iteration 1/3", "Calling function 'step'", "Moved to (1, 0)"]
        );
    }

    #[test]
    fn deleting_function_removes_calls_everywhere() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let doomed = session.create_function();
        let keeper = session.create_function();
        session.push_function_command(&keeper, call("inner-call", &doomed));
        session.push_command(looped("l", 1, vec![call("nested-call", &doomed)]));
        session.push_command(call("top-call", &doomed));

        session.delete_function(&doomed);

        assert_eq!(session.functions().len(), 1);
        assert!(!references_function(session.program(), &doomed));
        assert!(!references_function(&session.functions()[0].body, &doomed));
    }

    #[test]
    fn dangling_call_surfaces_as_unresolved_function() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let decision = session
            .run(&[call("k", "fn-gone")], &mut NoopObserver)
            .expect("run");
        assert_eq!(decision, RunDecision::Retry);
        assert!(matches!(
            session.last_result().and_then(|r| r.error.clone()),
            Some(ExecutionError::UnresolvedFunction { .. })
        ));
    }

    #[test]
    fn update_and_remove_reach_function_bodies() {
        let mut session = session(corridor_level(3, 1, Position::new(2, 0)));
        let function_id = session.create_function();
        session.push_function_command(&function_id, Command::new_turn("t", Rotation::Clockwise));
        session.update_command("t", &CommandPatch::rotation(Rotation::CounterClockwise));
        assert_eq!(
            session.functions()[0].body,
            vec![Command::new_turn("t", Rotation::CounterClockwise)]
        );
        session.remove_command("t");
        assert!(session.functions()[0].body.is_empty());
    }
}
