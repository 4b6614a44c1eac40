//! Test-only helpers for constructing levels and command trees.

use crate::core::types::{CommandKind, Orientation, Position, Rotation};
use crate::level::{Cell, Difficulty, Level, ObstacleKind};
use crate::program::{Command, Function};

const ALL_KINDS: [CommandKind; 5] = [
    CommandKind::Move,
    CommandKind::Turn,
    CommandKind::Conditional,
    CommandKind::Loop,
    CommandKind::Call,
];

/// Obstacle-free `width`×`height` level starting at (0,0) facing right.
///
/// Every command kind is allowed.
pub fn corridor_level(width: u32, height: u32, goal: Position) -> Level {
    Level {
        id: "corridor".to_string(),
        name: "Corridor".to_string(),
        description: "Test corridor".to_string(),
        difficulty: Difficulty::Easy,
        width,
        height,
        start: Position::new(0, 0),
        start_orientation: Orientation::Right,
        goal,
        cells: vec![Cell::goal(goal.x, goal.y)],
        allowed_commands: ALL_KINDS.to_vec(),
        tutorial: None,
        hints: Vec::new(),
    }
}

/// `corridor_level` with a wall at each of `walls`.
pub fn walled_level(width: u32, height: u32, goal: Position, walls: &[(i32, i32)]) -> Level {
    let mut level = corridor_level(width, height, goal);
    level.cells.extend(
        walls
            .iter()
            .map(|&(x, y)| Cell::obstacle(x, y, ObstacleKind::Wall)),
    );
    level
}

pub fn mv(id: &str) -> Command {
    Command::new_move(id)
}

/// Clockwise turn.
pub fn turn(id: &str) -> Command {
    Command::new_turn(id, Rotation::Clockwise)
}

pub fn turn_ccw(id: &str) -> Command {
    Command::new_turn(id, Rotation::CounterClockwise)
}

pub fn cond(id: &str, children: Vec<Command>) -> Command {
    Command::new_conditional(id, children)
}

pub fn looped(id: &str, times: u32, children: Vec<Command>) -> Command {
    Command::new_loop(id, times, children)
}

pub fn call(id: &str, function_id: &str) -> Command {
    Command::new_call(id, function_id)
}

pub fn function(id: &str, body: Vec<Command>) -> Function {
    Function {
        id: id.to_string(),
        name: format!("{} name", id),
        body,
    }
}
