//! Level definitions and level packs.

use serde::{Deserialize, Serialize};

use crate::core::types::{CommandKind, Orientation, Position, RobotState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Classification of an explicitly listed grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Empty,
    Obstacle,
    Goal,
}

/// Display-only obstacle flavor. Every flavor is equally impassable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Wall,
    Water,
    Gap,
    Battery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle: Option<ObstacleKind>,
}

impl Cell {
    pub fn empty(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            cell_type: CellType::Empty,
            obstacle: None,
        }
    }

    pub fn obstacle(x: i32, y: i32, kind: ObstacleKind) -> Self {
        Self {
            x,
            y,
            cell_type: CellType::Obstacle,
            obstacle: Some(kind),
        }
    }

    pub fn goal(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            cell_type: CellType::Goal,
            obstacle: None,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Immutable puzzle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub width: u32,
    pub height: u32,
    pub start: Position,
    pub start_orientation: Orientation,
    pub goal: Position,
    /// Sparse cell list; unlisted in-bounds cells are empty.
    #[serde(default)]
    pub cells: Vec<Cell>,
    pub allowed_commands: Vec<CommandKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutorial: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl Level {
    /// Robot state at the level's declared start.
    pub fn start_state(&self) -> RobotState {
        RobotState::new(self.start.x, self.start.y, self.start_orientation)
    }

    pub fn allows(&self, kind: CommandKind) -> bool {
        self.allowed_commands.contains(&kind)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && i64::from(position.x) < i64::from(self.width)
            && i64::from(position.y) < i64::from(self.height)
    }
}

/// Ordered collection of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPack {
    pub levels: Vec<Level>,
}

impl LevelPack {
    pub fn find(&self, level_id: &str) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    /// Level following `level_id` in pack order; `None` after the last one.
    pub fn next_after(&self, level_id: &str) -> Option<&Level> {
        let index = self.levels.iter().position(|level| level.id == level_id)?;
        self.levels.get(index + 1)
    }
}
