//! Array-shape inference over existing sub-trees.
//!
//! A leaf is a one-dimensional array of its elements. A group whose children are
//! named `0`, `1`, ... is one more dimension on top of its children.

use crate::database::{ConfigurationDatabase, NodeId, NodeKind};
use crate::utils::parse_index_name;
use log::error;
use miette::Diagnostic;
use thiserror::Error;

/// Shape found by [`array_dimensions`]: `sizes[d]` is the extent along dimension `d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDimensions {
    pub depth: usize,
    pub sizes: Vec<usize>,
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("group '{path}' has no children")]
    #[diagnostic(code(cdb::inference::empty_group))]
    EmptyGroup { path: String },

    #[error("child '{name}' of '{path}' is not an index")]
    #[diagnostic(code(cdb::inference::not_an_index))]
    NotAnIndex { path: String, name: String },

    #[error("'{path}' expected index {expected}, found {found}")]
    #[diagnostic(code(cdb::inference::non_sequential_index))]
    NonSequentialIndex {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("children of '{path}' have depth {found}, expected {expected}")]
    #[diagnostic(code(cdb::inference::inconsistent_depth))]
    InconsistentDepth {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("leaf '{path}' has {found} elements, expected {expected}")]
    #[diagnostic(code(cdb::inference::inconsistent_size))]
    InconsistentSize {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// Infers the array shape rooted at `node`.
///
/// In strict mode children must be exactly the indices `0..n`, siblings must share one
/// depth and leaves at one level must share one size. Otherwise non-index children are
/// ignored and sizes are maxima. A top-level result of depth 1 and size at most 1 is a
/// scalar (depth 0).
///
/// The walk keeps its own stack, so nesting depth is bounded by memory only.
pub fn array_dimensions(
    db: &ConfigurationDatabase,
    node: NodeId,
    strict: bool,
) -> Result<ArrayDimensions, InferenceError> {
    let mut sizes = Vec::new();
    let depth = infer(db, node, strict, &mut sizes).inspect_err(|e| error!("{e}"))?;
    sizes.truncate(depth);
    if depth == 1 && sizes.first().is_some_and(|size| *size <= 1) {
        return Ok(ArrayDimensions { depth: 0, sizes });
    }
    Ok(ArrayDimensions { depth, sizes })
}

/// A group whose indexed children are being visited.
struct Frame {
    node: NodeId,
    level: usize,
    children: Vec<(usize, NodeId)>,
    next: usize,
    max_index: Option<usize>,
    max_depth: Option<usize>,
}

impl Frame {
    fn record_depth(
        &mut self,
        db: &ConfigurationDatabase,
        depth: usize,
        strict: bool,
    ) -> Result<(), InferenceError> {
        if let Some(previous) = self.max_depth {
            if strict && previous != depth {
                return Err(InferenceError::InconsistentDepth {
                    path: db.path_of(self.node),
                    expected: previous,
                    found: depth,
                });
            }
        }
        self.max_depth = self.max_depth.max(Some(depth));
        Ok(())
    }
}

enum Visit {
    /// A leaf, already accounted for in `sizes`.
    Leaf,
    Group(Frame),
}

fn infer(
    db: &ConfigurationDatabase,
    node: NodeId,
    strict: bool,
    sizes: &mut Vec<usize>,
) -> Result<usize, InferenceError> {
    let mut stack = match visit(db, node, strict, sizes, 0)? {
        Visit::Leaf => return Ok(1),
        Visit::Group(frame) => vec![frame],
    };

    while let Some(frame) = stack.last_mut() {
        if let Some(&(index, child)) = frame.children.get(frame.next) {
            frame.next += 1;
            if strict {
                let expected = frame.max_index.map_or(0, |m| m + 1);
                if index != expected {
                    return Err(InferenceError::NonSequentialIndex {
                        path: db.path_of(frame.node),
                        expected,
                        found: index,
                    });
                }
            }
            frame.max_index = frame.max_index.max(Some(index));
            match visit(db, child, strict, sizes, frame.level + 1)? {
                Visit::Leaf => frame.record_depth(db, 1, strict)?,
                Visit::Group(inner) => stack.push(inner),
            }
            continue;
        }

        let size = frame.max_index.map_or(0, |m| m + 1);
        sizes[frame.level] = sizes[frame.level].max(size);
        let depth = frame.max_depth.map_or(0, |depth| depth + 1);
        stack.pop();
        match stack.last_mut() {
            Some(parent) => parent.record_depth(db, depth, strict)?,
            None => return Ok(depth),
        }
    }
    Ok(0)
}

/// Accounts for a leaf, or opens a frame over the indexed children of a group.
fn visit(
    db: &ConfigurationDatabase,
    node: NodeId,
    strict: bool,
    sizes: &mut Vec<usize>,
    level: usize,
) -> Result<Visit, InferenceError> {
    if sizes.len() <= level {
        sizes.resize(level + 1, 0);
    }
    let children = match &db.node(node).kind {
        NodeKind::Leaf(value) => {
            let count = value.number_of_elements();
            if strict && sizes[level] != 0 && sizes[level] != count {
                return Err(InferenceError::InconsistentSize {
                    path: db.path_of(node),
                    expected: sizes[level],
                    found: count,
                });
            }
            sizes[level] = sizes[level].max(count);
            return Ok(Visit::Leaf);
        }
        NodeKind::Group { children, .. } => children,
    };
    if children.is_empty() {
        return Err(InferenceError::EmptyGroup {
            path: db.path_of(node),
        });
    }

    let mut indexed = Vec::with_capacity(children.len());
    for child in children {
        let name = &db.node(*child).name;
        match parse_index_name(name) {
            Some(index) => indexed.push((index, *child)),
            None if strict => {
                return Err(InferenceError::NotAnIndex {
                    path: db.path_of(node),
                    name: name.clone(),
                })
            }
            None => {}
        }
    }
    if strict {
        indexed.sort_by_key(|(index, _)| *index);
    }
    Ok(Visit::Group(Frame {
        node,
        level,
        children: indexed,
        next: 0,
        max_index: None,
        max_depth: None,
    }))
}
