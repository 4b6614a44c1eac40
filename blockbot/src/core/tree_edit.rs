//! Pure structural edits on command trees.
//!
//! Every edit takes a borrowed tree and returns a new one. Edits that target an
//! unknown id, or ask a non-container to take children, return the tree
//! unchanged. No edit assumes a maximum depth.

use std::collections::HashSet;

use crate::core::types::Rotation;
use crate::program::{Command, Function};

/// Partial update merged into a node by [`update_node`].
///
/// Fields that do not apply to the target's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPatch {
    pub rotation: Option<Rotation>,
    pub times: Option<u32>,
    pub function_id: Option<String>,
    pub children: Option<Vec<Command>>,
}

impl CommandPatch {
    pub fn rotation(rotation: Rotation) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn times(times: u32) -> Self {
        Self {
            times: Some(times),
            ..Self::default()
        }
    }

    pub fn function_id(function_id: impl Into<String>) -> Self {
        Self {
            function_id: Some(function_id.into()),
            ..Self::default()
        }
    }

    fn apply(&self, node: &mut Command) {
        match node {
            Command::Turn { rotation, .. } => {
                if let Some(next) = self.rotation {
                    *rotation = next;
                }
            }
            Command::Loop {
                times, children, ..
            } => {
                if let Some(next) = self.times {
                    *times = next;
                }
                if let Some(next) = &self.children {
                    *children = next.clone();
                }
            }
            Command::Conditional { children, .. } => {
                if let Some(next) = &self.children {
                    *children = next.clone();
                }
            }
            Command::Call { function_id, .. } => {
                if let Some(next) = &self.function_id {
                    *function_id = next.clone();
                }
            }
            Command::Move { .. } | Command::Unsupported => {}
        }
    }
}

/// Merge `patch` into the node with `target_id`, wherever it is.
pub fn update_node(tree: &[Command], target_id: &str, patch: &CommandPatch) -> Vec<Command> {
    let mut next = tree.to_vec();
    if let Some(node) = find_node_mut(&mut next, target_id) {
        patch.apply(node);
    }
    next
}

/// Remove the node with `target_id` (and its subtree) from any depth.
pub fn remove_node(tree: &[Command], target_id: &str) -> Vec<Command> {
    retain_nodes(tree, &|node: &Command| !node.has_id(target_id))
}

/// Append `child` to the children of the container with `parent_id`.
pub fn add_child(tree: &[Command], parent_id: &str, child: Command) -> Vec<Command> {
    let mut next = tree.to_vec();
    if let Some(children) = find_node_mut(&mut next, parent_id).and_then(Command::children_mut) {
        children.push(child);
    }
    next
}

/// Remove every `Call` to `function_id`, at any depth.
pub fn remove_function_references(tree: &[Command], function_id: &str) -> Vec<Command> {
    retain_nodes(tree, &|node: &Command| !calls(node, function_id))
}

/// Reparent `node_id` under the container `new_parent_id`, or onto the top
/// level when `None`. The node is appended after the parent's existing
/// children.
///
/// Unchanged when the node is missing, the destination is missing or not a
/// container, or the destination lies inside the moved subtree.
pub fn move_node(tree: &[Command], node_id: &str, new_parent_id: Option<&str>) -> Vec<Command> {
    let Some(moved) = find_node(tree, node_id).cloned() else {
        return tree.to_vec();
    };

    let Some(parent_id) = new_parent_id else {
        let mut next = remove_node(tree, node_id);
        next.push(moved);
        return next;
    };

    if find_node(std::slice::from_ref(&moved), parent_id).is_some() {
        return tree.to_vec();
    }
    match find_node(tree, parent_id) {
        Some(parent) if parent.is_container() => {}
        _ => return tree.to_vec(),
    }

    let detached = remove_node(tree, node_id);
    add_child(&detached, parent_id, moved)
}

/// Drop `function_id` from the library and remove every call to it from the
/// program and from every remaining function body.
pub fn delete_function(
    program: &[Command],
    functions: &[Function],
    function_id: &str,
) -> (Vec<Command>, Vec<Function>) {
    let next_program = remove_function_references(program, function_id);
    let next_functions = functions
        .iter()
        .filter(|function| function.id != function_id)
        .map(|function| Function {
            body: remove_function_references(&function.body, function_id),
            ..function.clone()
        })
        .collect();
    (next_program, next_functions)
}

/// Depth-first search for the node with `target_id`.
pub fn find_node<'a>(tree: &'a [Command], target_id: &str) -> Option<&'a Command> {
    for node in tree {
        if node.has_id(target_id) {
            return Some(node);
        }
        if let Some(found) = node.children().and_then(|children| find_node(children, target_id)) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'a>(tree: &'a mut [Command], target_id: &str) -> Option<&'a mut Command> {
    for node in tree.iter_mut() {
        if node.has_id(target_id) {
            return Some(node);
        }
        if let Some(found) = node
            .children_mut()
            .and_then(|children| find_node_mut(children, target_id))
        {
            return Some(found);
        }
    }
    None
}

/// All node ids in depth-first order.
pub fn collect_ids(tree: &[Command]) -> Vec<String> {
    let mut ids = Vec::new();
    walk(tree, &mut |node| {
        if let Some(id) = node.id() {
            ids.push(id.to_string());
        }
    });
    ids
}

pub(crate) fn collect_ids_into(tree: &[Command], ids: &mut HashSet<String>) {
    walk(tree, &mut |node| {
        if let Some(id) = node.id() {
            ids.insert(id.to_string());
        }
    });
}

/// True if any node at any depth calls `function_id`.
pub fn references_function(tree: &[Command], function_id: &str) -> bool {
    let mut found = false;
    walk(tree, &mut |node| found |= calls(node, function_id));
    found
}

/// Visit every node depth-first, parents before children.
pub fn walk<F: FnMut(&Command)>(tree: &[Command], visit: &mut F) {
    for node in tree {
        visit(node);
        if let Some(children) = node.children() {
            walk(children, visit);
        }
    }
}

fn calls(node: &Command, target: &str) -> bool {
    matches!(node, Command::Call { function_id, .. } if function_id == target)
}

fn retain_nodes(tree: &[Command], keep: &dyn Fn(&Command) -> bool) -> Vec<Command> {
    tree.iter()
        .filter(|node| keep(node))
        .map(|node| {
            let mut node = node.clone();
            if let Some(children) = node.children_mut() {
                *children = retain_nodes(children, keep);
            }
            node
        })
        .collect()
}
