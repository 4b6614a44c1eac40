//! Static execution budget for block programs.
//!
//! The engine itself has no timeout. Callers that want bounded runs estimate
//! the worst-case number of node executions up front and refuse programs over
//! their ceiling.

use std::collections::HashMap;

use crate::program::{Command, Function, find_function};

/// Worst-case number of node executions for `program`.
///
/// Every conditional is assumed taken, loops multiply their bodies, and calls
/// expand until `max_call_depth` (where the engine would stop). Saturates at
/// `u64::MAX`.
pub fn estimate_executions(program: &[Command], functions: &[Function], max_call_depth: u32) -> u64 {
    let mut estimator = Estimator {
        functions,
        max_call_depth,
        memo: HashMap::new(),
    };
    estimator.sequence(program, 0)
}

struct Estimator<'a> {
    functions: &'a [Function],
    max_call_depth: u32,
    memo: HashMap<(&'a str, u32), u64>,
}

impl<'a> Estimator<'a> {
    fn sequence(&mut self, commands: &'a [Command], depth: u32) -> u64 {
        commands
            .iter()
            .fold(0u64, |total, command| total.saturating_add(self.node(command, depth)))
    }

    fn node(&mut self, command: &'a Command, depth: u32) -> u64 {
        match command {
            Command::Move { .. } | Command::Turn { .. } | Command::Unsupported => 1,
            Command::Conditional { children, .. } => 1u64.saturating_add(self.sequence(children, depth)),
            Command::Loop {
                times, children, ..
            } => {
                let body = self.sequence(children, depth);
                1u64.saturating_add(u64::from(*times).saturating_mul(body))
            }
            Command::Call { function_id, .. } => {
                if depth >= self.max_call_depth {
                    return 1;
                }
                let Some(function) = find_function(self.functions, function_id) else {
                    return 1;
                };
                let key = (function.id.as_str(), depth + 1);
                if let Some(cost) = self.memo.get(&key) {
                    return 1u64.saturating_add(*cost);
                }
                let cost = self.sequence(&function.body, depth + 1);
                self.memo.insert(key, cost);
                1u64.saturating_add(cost)
            }
        }
    }
}
