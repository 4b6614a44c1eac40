//! Block program interpreter.
//!
//! Walks a command tree against a [`RobotState`], threading the state by value
//! through every node. The first failing node aborts the whole run; nothing
//! is rolled back and the last successful state is reported.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::grid::Grid;
use crate::core::types::{Orientation, Position, RobotState};
use crate::level::Level;
use crate::program::{Command, Function, find_function};

/// Default ceiling on nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 32;

pub const SUCCESS_MESSAGE_PREFIX: &str = "Success! Reached the goal in";
pub const GOAL_NOT_REACHED_MESSAGE: &str = "Goal not reached. Try again!";

/// Run-wide engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of simultaneously active function calls.
    pub max_call_depth: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Engine failures. Each one ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    /// The move target is an obstacle or lies outside the grid.
    #[error("Tried to move into an obstacle or off the map at ({x}, {y})")]
    CollisionOrBounds { x: i32, y: i32 },
    /// A `Call` names a function missing from the library.
    #[error("Function '{function_id}' does not exist")]
    UnresolvedFunction { function_id: String },
    /// Function calls nested deeper than the configured limit.
    #[error("Function calls nested deeper than {limit} levels")]
    CallDepthExceeded { limit: u32 },
}

/// One human-readable step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Moved { to: Position },
    Turned { orientation: Orientation },
    SensorChecked { ahead: Position, blocked: bool },
    LoopIteration { iteration: u32, total: u32 },
    FunctionEntered { function_id: String, name: String },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Moved { to } => write!(f, "Moved to {to}"),
            TraceEvent::Turned { orientation } => write!(f, "Turned to face {orientation}"),
            TraceEvent::SensorChecked {
                ahead,
                blocked: true,
            } => write!(f, "Obstacle ahead at {ahead}"),
            TraceEvent::SensorChecked {
                ahead,
                blocked: false,
            } => write!(f, "Path clear at {ahead}"),
            TraceEvent::LoopIteration { iteration, total } => {
                write!(f, "Loop iteration {iteration}/{total}")
            }
            TraceEvent::FunctionEntered { name, .. } => write!(f, "Calling function '{name}'"),
        }
    }
}

/// Append-only event log of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Rendered lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Terminal record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Top-level commands completed; a loop counts once.
    pub steps: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    /// Top-level command that failed, for block highlighting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_command_id: Option<String>,
    /// Innermost node that failed (equals `failed_command_id` at top level).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_node_id: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(steps: u32) -> Self {
        Self {
            success: true,
            steps,
            message: format!("{SUCCESS_MESSAGE_PREFIX} {steps} steps!"),
            error: None,
            failed_command_id: None,
            failed_node_id: None,
        }
    }

    pub fn goal_not_reached(steps: u32) -> Self {
        Self::unsuccessful(steps, GOAL_NOT_REACHED_MESSAGE)
    }

    /// Unsuccessful outcome that is not an engine error.
    pub fn unsuccessful(steps: u32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            steps,
            message: message.into(),
            error: None,
            failed_command_id: None,
            failed_node_id: None,
        }
    }

    fn failed(
        steps: u32,
        error: ExecutionError,
        command_id: Option<&str>,
        node_id: Option<String>,
    ) -> Self {
        Self {
            success: false,
            steps,
            message: error.to_string(),
            error: Some(error),
            failed_command_id: command_id.map(str::to_string),
            failed_node_id: node_id,
        }
    }

    /// All commands ran but the robot stopped short of the goal.
    pub fn is_goal_not_reached(&self) -> bool {
        !self.success && self.error.is_none()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub result: ExecutionResult,
    pub trace: ExecutionTrace,
    pub final_state: RobotState,
}

/// Hooks invoked while a run progresses.
///
/// The engine calls `after_command` once per executed node, nested or not,
/// which is where animation pacing belongs. Hooks cannot alter the outcome.
pub trait ExecutionObserver {
    fn on_event(&mut self, _event: &TraceEvent) {}

    fn after_command(&mut self, _command: &Command, _state: &RobotState) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Interpret `program` from `initial` and check the goal.
pub fn run<O: ExecutionObserver + ?Sized>(
    program: &[Command],
    functions: &[Function],
    level: &Level,
    initial: RobotState,
    options: &RunOptions,
    observer: &mut O,
) -> RunReport {
    debug!(
        level = %level.id,
        commands = program.len(),
        functions = functions.len(),
        "run started"
    );
    let mut interpreter = Interpreter {
        grid: Grid::new(level),
        functions,
        options,
        observer,
        trace: ExecutionTrace::new(),
    };

    let mut state = initial;
    let mut steps = 0u32;
    for command in program {
        match interpreter.execute(command, state, 0) {
            Ok(next) => {
                state = next;
                steps = steps.saturating_add(1);
            }
            Err(failure) => {
                info!(
                    level = %level.id,
                    steps,
                    command_id = ?command.id(),
                    error = %failure.error,
                    "run failed"
                );
                let mut final_state = failure.state;
                final_state.reached_goal = false;
                return RunReport {
                    result: ExecutionResult::failed(
                        steps,
                        failure.error,
                        command.id(),
                        failure.node_id,
                    ),
                    trace: interpreter.trace,
                    final_state,
                };
            }
        }
    }

    state.reached_goal = state.position() == level.goal;
    let result = if state.reached_goal {
        ExecutionResult::succeeded(steps)
    } else {
        ExecutionResult::goal_not_reached(steps)
    };
    info!(level = %level.id, steps, success = result.success, "run finished");
    RunReport {
        result,
        trace: interpreter.trace,
        final_state: state,
    }
}

struct Failure {
    error: ExecutionError,
    /// Last successful state before the failing node.
    state: RobotState,
    node_id: Option<String>,
}

type Step = Result<RobotState, Failure>;

struct Interpreter<'a, O: ?Sized> {
    grid: Grid,
    functions: &'a [Function],
    options: &'a RunOptions,
    observer: &'a mut O,
    trace: ExecutionTrace,
}

impl<O: ExecutionObserver + ?Sized> Interpreter<'_, O> {
    fn execute(&mut self, command: &Command, state: RobotState, depth: u32) -> Step {
        let next = match command {
            Command::Move { id } => {
                let (target, enterable) = self.look_ahead(&state);
                if !enterable {
                    return Err(Failure {
                        error: ExecutionError::CollisionOrBounds {
                            x: target.x,
                            y: target.y,
                        },
                        state,
                        node_id: Some(id.clone()),
                    });
                }
                self.record(TraceEvent::Moved { to: target });
                state.with_position(target)
            }
            Command::Turn { rotation, .. } => {
                let orientation = state.orientation.rotated(*rotation);
                self.record(TraceEvent::Turned { orientation });
                state.with_orientation(orientation)
            }
            Command::Conditional { children, .. } => {
                let (ahead, enterable) = self.look_ahead(&state);
                let blocked = !enterable;
                self.record(TraceEvent::SensorChecked { ahead, blocked });
                if blocked {
                    self.execute_sequence(children, state, depth)?
                } else {
                    state
                }
            }
            Command::Loop {
                times, children, ..
            } => {
                let mut current = state;
                for iteration in 1..=*times {
                    self.record(TraceEvent::LoopIteration {
                        iteration,
                        total: *times,
                    });
                    current = self.execute_sequence(children, current, depth)?;
                }
                current
            }
            Command::Call { id, function_id } => {
                if depth >= self.options.max_call_depth {
                    return Err(Failure {
                        error: ExecutionError::CallDepthExceeded {
                            limit: self.options.max_call_depth,
                        },
                        state,
                        node_id: Some(id.clone()),
                    });
                }
                let Some(function) = find_function(self.functions, function_id) else {
                    return Err(Failure {
                        error: ExecutionError::UnresolvedFunction {
                            function_id: function_id.clone(),
                        },
                        state,
                        node_id: Some(id.clone()),
                    });
                };
                self.record(TraceEvent::FunctionEntered {
                    function_id: function.id.clone(),
                    name: function.name.clone(),
                });
                self.execute_sequence(&function.body, state, depth + 1)?
            }
            Command::Unsupported => state,
        };
        self.observer.after_command(command, &next);
        Ok(next)
    }

    /// Cell ahead of `state` and whether the robot may enter it. A step off
    /// the `i32` plane is out of bounds, reported at the clamped coordinate.
    fn look_ahead(&self, state: &RobotState) -> (Position, bool) {
        match state.position().ahead(state.orientation) {
            Some(target) => (target, self.grid.is_enterable(target)),
            None => {
                let (dx, dy) = state.orientation.offset();
                let clamped = Position::new(state.x.saturating_add(dx), state.y.saturating_add(dy));
                (clamped, false)
            }
        }
    }

    fn execute_sequence(&mut self, commands: &[Command], state: RobotState, depth: u32) -> Step {
        commands
            .iter()
            .try_fold(state, |current, command| self.execute(command, current, depth))
    }

    fn record(&mut self, event: TraceEvent) {
        self.observer.on_event(&event);
        self.trace.push(event);
    }
}
