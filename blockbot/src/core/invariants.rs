//! Semantic invariants not expressible via JSON Schema.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::tree_edit::walk;
use crate::core::types::{CommandKind, Position};
use crate::level::{CellType, Level, LevelPack};
use crate::program::{Command, Function, find_function};

/// Check level invariants:
/// - `width > 0` and `height > 0`
/// - start and goal inside the grid, start not on an obstacle
/// - cells inside the grid, no duplicate coordinates
/// - `allowed_commands` non-empty
pub fn validate_level(level: &Level) -> Vec<String> {
    let mut errors = Vec::new();
    let label = level.id.as_str();

    if level.width == 0 || level.height == 0 {
        errors.push(format!(
            "{}: grid must be at least 1x1 (got {}x{})",
            label, level.width, level.height
        ));
    }
    if !level.contains(level.start) {
        errors.push(format!("{}: start {} is outside the grid", label, level.start));
    }
    if !level.contains(level.goal) {
        errors.push(format!("{}: goal {} is outside the grid", label, level.goal));
    }

    let mut seen: HashMap<Position, CellType> = HashMap::new();
    for cell in &level.cells {
        let position = cell.position();
        if !level.contains(position) {
            errors.push(format!("{}: cell {} is outside the grid", label, position));
        }
        if seen.insert(position, cell.cell_type).is_some() {
            errors.push(format!("{}: duplicate cell {}", label, position));
        }
    }
    if seen.get(&level.start) == Some(&CellType::Obstacle) {
        errors.push(format!("{}: start {} is an obstacle", label, level.start));
    }
    if seen.get(&level.goal) == Some(&CellType::Obstacle) {
        errors.push(format!("{}: goal {} is an obstacle", label, level.goal));
    }

    if level.allowed_commands.is_empty() {
        errors.push(format!("{}: allowed_commands must not be empty", label));
    }

    errors
}

/// Check every level plus pack-wide invariants (unique level ids).
pub fn validate_pack(pack: &LevelPack) -> Vec<String> {
    let mut errors = Vec::new();
    if pack.levels.is_empty() {
        errors.push("level pack has no levels".to_string());
    }
    let mut ids = HashSet::new();
    for level in &pack.levels {
        if !ids.insert(level.id.as_str()) {
            errors.push(format!("duplicate level id '{}'", level.id));
        }
        errors.extend(validate_level(level));
    }
    errors
}

/// Check program invariants:
/// - no duplicate node ids across the program and every function body
/// - no duplicate function ids
pub fn validate_program(program: &[Command], functions: &[Function]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut node_ids = HashSet::new();
    check_unique_ids(program, "program", &mut node_ids, &mut errors);

    let mut function_ids = HashSet::new();
    for function in functions {
        if !function_ids.insert(function.id.as_str()) {
            errors.push(format!("duplicate function id '{}'", function.id));
        }
        let scope = format!("function '{}'", function.id);
        check_unique_ids(&function.body, &scope, &mut node_ids, &mut errors);
    }
    errors
}

/// Command kinds used by `program` (or any function it can reach through
/// `Call` blocks) that the level does not allow, in stable order.
///
/// Functions nothing calls are ignored.
pub fn disallowed_kinds(level: &Level, program: &[Command], functions: &[Function]) -> Vec<CommandKind> {
    let mut used = BTreeSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&[Command]> = vec![program];
    while let Some(tree) = pending.pop() {
        walk(tree, &mut |node: &Command| {
            if let Some(kind) = node.kind() {
                used.insert(kind);
            }
            if let Command::Call { function_id, .. } = node {
                if let Some(function) = find_function(functions, function_id) {
                    if visited.insert(function.id.as_str()) {
                        pending.push(&function.body);
                    }
                }
            }
        });
    }
    used.into_iter().filter(|kind| !level.allows(*kind)).collect()
}

fn check_unique_ids(
    tree: &[Command],
    scope: &str,
    seen: &mut HashSet<String>,
    errors: &mut Vec<String>,
) {
    walk(tree, &mut |node| {
        if let Some(id) = node.id() {
            if !seen.insert(id.to_string()) {
                errors.push(format!("{}: duplicate node id '{}'", scope, id));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Cell, ObstacleKind};
    use crate::test_support::{
        call, cond, corridor_level, function, looped, mv, turn, walled_level,
    };

    #[test]
    fn valid_level_has_no_errors() {
        let level = walled_level(4, 2, Position::new(3, 1), &[(1, 0)]);
        assert!(validate_level(&level).is_empty());
    }

    #[test]
    fn reports_duplicate_cells_and_bounds() {
        let mut level = corridor_level(3, 1, Position::new(5, 0));
        level.cells.push(Cell::obstacle(1, 0, ObstacleKind::Wall));
        level.cells.push(Cell::empty(1, 0));
        level.cells.push(Cell::empty(0, 4));

        let errors = validate_level(&level);
        assert!(errors.iter().any(|err| err.contains("goal (5, 0) is outside")));
        assert!(errors.iter().any(|err| err.contains("duplicate cell (1, 0)")));
        assert!(errors.iter().any(|err| err.contains("cell (0, 4) is outside")));
    }

    #[test]
    fn reports_zero_sized_grid_and_blocked_start() {
        let mut level = walled_level(3, 1, Position::new(2, 0), &[(0, 0)]);
        level.height = 0;
        level.allowed_commands.clear();
        let errors = validate_level(&level);
        assert!(errors.iter().any(|err| err.contains("at least 1x1")));
        assert!(errors.iter().any(|err| err.contains("start (0, 0) is an obstacle")));
        assert!(errors.iter().any(|err| err.contains("allowed_commands")));
    }

    #[test]
    fn pack_rejects_duplicate_level_ids() {
        let level = corridor_level(3, 1, Position::new(2, 0));
        let pack = LevelPack {
            levels: vec![level.clone(), level],
        };
        assert_eq!(validate_pack(&pack), vec!["duplicate level id 'corridor'".to_string()]);
    }

    #[test]
    fn program_ids_must_be_unique_across_functions() {
        let program = vec![mv("a"), looped("l", 2, vec![mv("a")])];
        let functions = vec![function("fn-1", vec![turn("l")]), function("fn-1", Vec::new())];
        let errors = validate_program(&program, &functions);
        assert_eq!(
            errors,
            vec![
                "program: duplicate node id 'a'".to_string(),
                "function 'fn-1': duplicate node id 'l'".to_string(),
                "duplicate function id 'fn-1'".to_string(),
            ]
        );
    }

    #[test]
    fn disallowed_kinds_scans_functions() {
        let mut level = corridor_level(3, 1, Position::new(2, 0));
        level.allowed_commands = vec![CommandKind::Move, CommandKind::Call];
        let program = vec![mv("a"), call("k", "fn-1")];
        let functions = vec![function("fn-1", vec![looped("l", 1, vec![turn("t")])])];

        assert_eq!(
            disallowed_kinds(&level, &program, &functions),
            vec![CommandKind::Turn, CommandKind::Loop]
        );
    }

    #[test]
    fn disallowed_kinds_ignores_uncalled_functions() {
        let mut level = corridor_level(3, 1, Position::new(2, 0));
        level.allowed_commands = vec![CommandKind::Move];
        let functions = vec![function("fn-unused", vec![turn("t")])];

        assert!(disallowed_kinds(&level, &[mv("a")], &functions).is_empty());
    }

    #[test]
    fn disallowed_kinds_follows_nested_and_recursive_calls() {
        let mut level = corridor_level(3, 1, Position::new(2, 0));
        level.allowed_commands = vec![CommandKind::Move, CommandKind::Call];
        let functions = vec![
            function("fn-a", vec![call("ka", "fn-b"), call("self", "fn-a")]),
            function("fn-b", vec![cond("c", vec![mv("m")])]),
            function("fn-idle", vec![looped("l", 2, vec![])]),
        ];

        assert_eq!(
            disallowed_kinds(&level, &[call("k", "fn-a")], &functions),
            vec![CommandKind::Conditional]
        );
    }
}
