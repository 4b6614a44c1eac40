//! Block program data model: command trees and the function library.

use std::collections::HashSet;

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::core::types::{CommandKind, Rotation};

/// Smallest loop count the editing surface offers.
pub const LOOP_TIMES_MIN: u32 = 1;
/// Largest loop count the editing surface offers.
pub const LOOP_TIMES_MAX: u32 = 10;

const ID_LENGTH: usize = 10;
const ID_ATTEMPTS: usize = 64;

/// One node of a block program.
///
/// Serialized with a `kind` tag. Unknown kinds deserialize to
/// [`Command::Unsupported`], which the engine treats as a no-op.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Move {
        id: String,
    },
    Turn {
        id: String,
        #[serde(default)]
        rotation: Rotation,
    },
    Conditional {
        id: String,
        #[serde(default)]
        children: Vec<Command>,
    },
    Loop {
        id: String,
        times: u32,
        #[serde(default)]
        children: Vec<Command>,
    },
    Call {
        id: String,
        function_id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl Command {
    pub fn new_move(id: impl Into<String>) -> Self {
        Command::Move { id: id.into() }
    }

    pub fn new_turn(id: impl Into<String>, rotation: Rotation) -> Self {
        Command::Turn {
            id: id.into(),
            rotation,
        }
    }

    pub fn new_conditional(id: impl Into<String>, children: Vec<Command>) -> Self {
        Command::Conditional {
            id: id.into(),
            children,
        }
    }

    pub fn new_loop(id: impl Into<String>, times: u32, children: Vec<Command>) -> Self {
        Command::Loop {
            id: id.into(),
            times,
            children,
        }
    }

    pub fn new_call(id: impl Into<String>, function_id: impl Into<String>) -> Self {
        Command::Call {
            id: id.into(),
            function_id: function_id.into(),
        }
    }

    /// Fresh block of `kind` with the palette defaults: one loop iteration,
    /// clockwise turn, empty containers.
    ///
    /// `Call` blocks start pointing at `function_id`, which may be empty until
    /// the editing surface assigns one.
    pub fn with_defaults(kind: CommandKind, id: impl Into<String>, function_id: &str) -> Self {
        match kind {
            CommandKind::Move => Command::new_move(id),
            CommandKind::Turn => Command::new_turn(id, Rotation::Clockwise),
            CommandKind::Conditional => Command::new_conditional(id, Vec::new()),
            CommandKind::Loop => Command::new_loop(id, LOOP_TIMES_MIN, Vec::new()),
            CommandKind::Call => Command::new_call(id, function_id),
        }
    }

    /// Node id; `None` for unsupported nodes.
    pub fn id(&self) -> Option<&str> {
        match self {
            Command::Move { id }
            | Command::Turn { id, .. }
            | Command::Conditional { id, .. }
            | Command::Loop { id, .. }
            | Command::Call { id, .. } => Some(id.as_str()),
            Command::Unsupported => None,
        }
    }

    pub fn kind(&self) -> Option<CommandKind> {
        match self {
            Command::Move { .. } => Some(CommandKind::Move),
            Command::Turn { .. } => Some(CommandKind::Turn),
            Command::Conditional { .. } => Some(CommandKind::Conditional),
            Command::Loop { .. } => Some(CommandKind::Loop),
            Command::Call { .. } => Some(CommandKind::Call),
            Command::Unsupported => None,
        }
    }

    /// Children of container nodes (`Conditional`, `Loop`).
    pub fn children(&self) -> Option<&[Command]> {
        match self {
            Command::Conditional { children, .. } | Command::Loop { children, .. } => {
                Some(children.as_slice())
            }
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Command>> {
        match self {
            Command::Conditional { children, .. } | Command::Loop { children, .. } => {
                Some(children)
            }
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.children().is_some()
    }

    pub fn has_id(&self, target_id: &str) -> bool {
        self.id() == Some(target_id)
    }
}

/// Named, reusable command sequence invoked through `Call` blocks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Function {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub body: Vec<Command>,
}

impl Function {
    /// Empty function named after its 1-based position in the library.
    pub fn new(id: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            name: default_function_name(position),
            body: Vec::new(),
        }
    }
}

pub fn default_function_name(position: usize) -> String {
    format!("Function {}", position)
}

/// Clamp a loop count into the range the editing surface offers.
pub fn clamp_loop_times(times: u32) -> u32 {
    times.clamp(LOOP_TIMES_MIN, LOOP_TIMES_MAX)
}

/// Look up a function by id.
pub fn find_function<'a>(functions: &'a [Function], function_id: &str) -> Option<&'a Function> {
    functions.iter().find(|function| function.id == function_id)
}

/// Generates ids that are unique within one program + function snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Fresh `cmd-...` id absent from `program` and every function body.
    pub fn command_id(&self, program: &[Command], functions: &[Function]) -> String {
        let mut taken = HashSet::new();
        crate::core::tree_edit::collect_ids_into(program, &mut taken);
        for function in functions {
            taken.insert(function.id.clone());
            crate::core::tree_edit::collect_ids_into(&function.body, &mut taken);
        }
        self.fresh("cmd", &taken)
    }

    /// Fresh `fn-...` id absent from the function library.
    pub fn function_id(&self, functions: &[Function]) -> String {
        let taken: HashSet<String> = functions.iter().map(|f| f.id.clone()).collect();
        self.fresh("fn", &taken)
    }

    fn fresh(&self, prefix: &str, taken: &HashSet<String>) -> String {
        let mut rng = rand::thread_rng();
        let mut candidate = String::new();
        for _ in 0..ID_ATTEMPTS {
            let suffix: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
                .map(char::from)
                .take(ID_LENGTH)
                .collect::<String>()
                .to_lowercase();
            candidate = format!("{prefix}-{suffix}");
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
        // Counter suffix as a last resort.
        let mut counter = taken.len();
        loop {
            let fallback = format!("{candidate}-{counter}");
            if !taken.contains(&fallback) {
                return fallback;
            }
            counter += 1;
        }
    }
}
