//! Occupancy queries over a level's static geometry.

use std::collections::HashMap;

use crate::core::types::Position;
use crate::level::{CellType, Level};

/// Indexed view of a level's sparse cell list.
///
/// Answers are pure: identical inputs yield identical answers for the
/// lifetime of the grid.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: HashMap<Position, CellType>,
}

impl Grid {
    pub fn new(level: &Level) -> Self {
        // Duplicate coordinates are rejected at load time; if one slips
        // through, the first listing wins.
        let mut cells = HashMap::with_capacity(level.cells.len());
        for cell in &level.cells {
            cells.entry(cell.position()).or_insert(cell.cell_type);
        }
        Self {
            width: level.width,
            height: level.height,
            cells,
        }
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && i64::from(position.x) < i64::from(self.width)
            && i64::from(position.y) < i64::from(self.height)
    }

    /// Classification of `position`: `None` outside the grid, `Empty` when
    /// in bounds and unlisted.
    pub fn cell_at(&self, position: Position) -> Option<CellType> {
        if !self.in_bounds(position) {
            return None;
        }
        Some(
            self.cells
                .get(&position)
                .copied()
                .unwrap_or(CellType::Empty),
        )
    }

    /// True iff `position` is in bounds and not an obstacle.
    pub fn is_enterable(&self, position: Position) -> bool {
        matches!(
            self.cell_at(position),
            Some(CellType::Empty | CellType::Goal)
        )
    }
}
