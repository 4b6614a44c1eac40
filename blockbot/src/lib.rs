//! Grid-robot engine for block-based programming puzzles.
//!
//! A player assembles a tree of command blocks (move, turn, conditional,
//! loop, call) plus a library of named functions; the engine interprets it
//! against a level grid and reports whether the robot reached the goal.
//!
//! - **[`core`]**: Pure, deterministic logic (grid, tree edits, interpreter,
//!   budget, invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, level packs, program and
//!   progress files, wall-clock pacing).
//!
//! [`session`] holds the state of one level attempt. [`play`] and
//! [`validate`] coordinate core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod level;
pub mod logging;
pub mod play;
pub mod program;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
