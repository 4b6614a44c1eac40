//! Shared deterministic types for the simulation core.
//!
//! These types define stable contracts between core components. They carry no
//! I/O and serialize to stable, lowercase JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Facing of the robot on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
}

/// Clockwise order starting from `Right`.
const CLOCKWISE: [Orientation; 4] = [
    Orientation::Right,
    Orientation::Down,
    Orientation::Left,
    Orientation::Up,
];

impl Orientation {
    /// Unit offset of one forward step. `y` grows downwards.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Orientation::Right => (1, 0),
            Orientation::Down => (0, 1),
            Orientation::Left => (-1, 0),
            Orientation::Up => (0, -1),
        }
    }

    /// Orientation after one quarter turn in `rotation` sense.
    pub fn rotated(self, rotation: Rotation) -> Orientation {
        let index = CLOCKWISE
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(0);
        let next = match rotation {
            Rotation::Clockwise => (index + 1) % CLOCKWISE.len(),
            Rotation::CounterClockwise => (index + CLOCKWISE.len() - 1) % CLOCKWISE.len(),
        };
        CLOCKWISE[next]
    }

    pub fn label(self) -> &'static str {
        match self {
            Orientation::Up => "up",
            Orientation::Down => "down",
            Orientation::Left => "left",
            Orientation::Right => "right",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sense of a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell one step ahead when facing `orientation`; `None` when the step
    /// leaves the `i32` plane.
    pub fn ahead(self, orientation: Orientation) -> Option<Position> {
        let (dx, dy) = orientation.offset();
        Some(Position::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
        ))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Simulated robot state. Copied, never shared, between execution steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotState {
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
    /// Set only by the top-level goal check.
    pub reached_goal: bool,
}

impl RobotState {
    pub fn new(x: i32, y: i32, orientation: Orientation) -> Self {
        Self {
            x,
            y,
            orientation,
            reached_goal: false,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn with_position(self, position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
            ..self
        }
    }

    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self {
            orientation,
            ..self
        }
    }
}

/// Data-less command kind, used for allowed-command sets and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Move,
    Turn,
    Conditional,
    Loop,
    Call,
}

impl CommandKind {
    pub fn label(self) -> &'static str {
        match self {
            CommandKind::Move => "move",
            CommandKind::Turn => "turn",
            CommandKind::Conditional => "conditional",
            CommandKind::Loop => "loop",
            CommandKind::Call => "call",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_clockwise_turns_are_identity() {
        for start in CLOCKWISE {
            let mut facing = start;
            for _ in 0..4 {
                facing = facing.rotated(Rotation::Clockwise);
            }
            assert_eq!(facing, start);
        }
    }

    #[test]
    fn opposite_turns_cancel() {
        for start in CLOCKWISE {
            let facing = start
                .rotated(Rotation::Clockwise)
                .rotated(Rotation::CounterClockwise);
            assert_eq!(facing, start);
        }
    }

    #[test]
    fn clockwise_order_follows_right_down_left_up() {
        assert_eq!(Orientation::Right.rotated(Rotation::Clockwise), Orientation::Down);
        assert_eq!(Orientation::Down.rotated(Rotation::Clockwise), Orientation::Left);
        assert_eq!(Orientation::Left.rotated(Rotation::Clockwise), Orientation::Up);
        assert_eq!(Orientation::Up.rotated(Rotation::Clockwise), Orientation::Right);
        assert_eq!(
            Orientation::Right.rotated(Rotation::CounterClockwise),
            Orientation::Up
        );
    }

    #[test]
    fn ahead_uses_screen_coordinates() {
        let origin = Position::new(2, 2);
        assert_eq!(origin.ahead(Orientation::Right), Some(Position::new(3, 2)));
        assert_eq!(origin.ahead(Orientation::Down), Some(Position::new(2, 3)));
        assert_eq!(origin.ahead(Orientation::Left), Some(Position::new(1, 2)));
        assert_eq!(origin.ahead(Orientation::Up), Some(Position::new(2, 1)));
    }

    #[test]
    fn ahead_off_the_plane_is_none() {
        assert_eq!(Position::new(i32::MAX, 0).ahead(Orientation::Right), None);
        assert_eq!(Position::new(0, i32::MIN).ahead(Orientation::Up), None);
        assert_eq!(
            Position::new(i32::MAX, 0).ahead(Orientation::Left),
            Some(Position::new(i32::MAX - 1, 0))
        );
    }

    #[test]
    fn rotation_serializes_snake_case() {
        let json = serde_json::to_string(&Rotation::CounterClockwise).expect("serialize");
        assert_eq!(json, "\"counter_clockwise\"");
    }
}
