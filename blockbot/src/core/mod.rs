//! Deterministic, pure logic for the block-program simulation.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod engine;
pub mod grid;
pub mod invariants;
pub mod tree_edit;
pub mod types;
