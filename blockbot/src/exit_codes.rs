//! Stable exit codes for blockbot CLI commands.

/// Command succeeded; for `blockbot run`, the robot reached the goal.
pub const OK: i32 = 0;
/// Invalid input: unreadable or malformed pack/program/config, unknown level,
/// disallowed command, or a program over the execution budget.
pub const INVALID: i32 = 1;
/// `blockbot run` finished without reaching the goal.
pub const NOT_WON: i32 = 2;
