use crate::sink::{SinkError, StructuredDataSink};
use crate::types::{ConversionError, FromElement, LeafValue, TypeName};
use log::debug;
use miette::Diagnostic;
use thiserror::Error;

/// Index of a node inside a [`ConfigurationDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group {
        children: Vec<NodeId>,
        /// Type cast written in front of the group's `{`, kept verbatim.
        type_name: Option<String>,
    },
    Leaf(LeafValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    #[must_use]
    pub fn leaf(&self) -> Option<&LeafValue> {
        match &self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Group { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children, .. } => children,
            NodeKind::Leaf(_) => &[],
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ReadError {
    #[error("no leaf named '{name}'")]
    #[diagnostic(code(cdb::read::not_found))]
    NotFound { name: String },

    #[error("'{name}' is a group, not a leaf")]
    #[diagnostic(code(cdb::read::not_a_leaf))]
    NotALeaf { name: String },

    #[error("'{name}' holds {count} elements, expected a scalar")]
    #[diagnostic(code(cdb::read::not_scalar))]
    NotScalar { name: String, count: usize },

    #[error("'{name}' is not a link")]
    #[diagnostic(code(cdb::read::not_a_link))]
    NotALink { name: String },

    #[error("link '{name}' points to missing node '{target}'")]
    #[diagnostic(code(cdb::read::dangling_link))]
    DanglingLink { name: String, target: String },

    #[error("reading '{name}': {source}")]
    #[diagnostic(code(cdb::read::conversion))]
    Conversion {
        name: String,
        #[source]
        source: ConversionError,
    },
}

/// In-memory hierarchical store of named groups and typed leaves.
///
/// Nodes live in an arena; a cursor marks the current group, which is where
/// relative lookups and sink writes take place.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDatabase {
    nodes: Vec<Node>,
    current: NodeId,
}

impl Default for ConfigurationDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationDatabase {
    #[must_use]
    pub fn new() -> Self {
        ConfigurationDatabase {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                kind: NodeKind::Group {
                    children: Vec::new(),
                    type_name: None,
                },
            }],
            current: NodeId(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn current(&self) -> NodeId {
        self.current
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Declared type of a group, if one was written in front of its `{`.
    #[must_use]
    pub fn type_annotation(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Group { type_name, .. } => type_name.as_deref(),
            NodeKind::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn current_name(&self) -> &str {
        &self.node(self.current).name
    }

    /// Dotted path from the root to the cursor; empty at the root.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path_of(self.current)
    }

    #[must_use]
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(node_id) = cursor {
            let node = self.node(node_id);
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            cursor = node.parent;
        }
        names.reverse();
        names.join(".")
    }

    #[must_use]
    pub fn number_of_children(&self) -> usize {
        self.node(self.current).children().len()
    }

    #[must_use]
    pub fn child_name(&self, index: usize) -> Option<&str> {
        let id = self.node(self.current).children().get(index)?;
        Some(&self.node(*id).name)
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children()
            .iter()
            .copied()
            .find(|id| self.node(*id).name == name)
    }

    /// Follows a dotted path from `start`. An empty path is `start` itself.
    #[must_use]
    pub fn find_from(&self, start: NodeId, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(start);
        }
        path.split('.')
            .try_fold(start, |node, segment| self.child_named(node, segment))
    }

    /// Follows a dotted path relative to the cursor.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.find_from(self.current, path)
    }

    fn move_to_group(&mut self, start: NodeId, path: &str) -> Result<(), SinkError> {
        let target = self
            .find_from(start, path)
            .ok_or_else(|| SinkError::NotFound {
                path: path.to_string(),
            })?;
        if self.node(target).is_leaf() {
            return Err(SinkError::LeafInTheWay {
                name: path.to_string(),
            });
        }
        self.current = target;
        Ok(())
    }

    /// Moves the cursor to the group at a dotted path from the root.
    pub fn move_absolute(&mut self, path: &str) -> Result<(), SinkError> {
        self.move_to_group(self.root(), path)
    }

    /// Moves the cursor to the group at a dotted path from the cursor.
    pub fn move_relative(&mut self, path: &str) -> Result<(), SinkError> {
        self.move_to_group(self.current, path)
    }

    /// Moves the cursor to the `index`-th child, which must be a group.
    pub fn move_to_child(&mut self, index: usize) -> Result<(), SinkError> {
        let Some(id) = self.node(self.current).children().get(index).copied() else {
            return Err(SinkError::NotFound {
                path: format!("{}[{index}]", self.current_path()),
            });
        };
        if self.node(id).is_leaf() {
            return Err(SinkError::LeafInTheWay {
                name: self.node(id).name.clone(),
            });
        }
        self.current = id;
        Ok(())
    }

    /// The leaf at a dotted path relative to the cursor.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LeafValue> {
        self.node(self.find(name)?).leaf()
    }

    fn leaf_for_read(&self, name: &str) -> Result<&LeafValue, ReadError> {
        let id = self.find(name).ok_or_else(|| ReadError::NotFound {
            name: name.to_string(),
        })?;
        self.node(id).leaf().ok_or_else(|| ReadError::NotALeaf {
            name: name.to_string(),
        })
    }

    /// Reads a single-element leaf as `T`.
    pub fn read<T: FromElement>(&self, name: &str) -> Result<T, ReadError> {
        let leaf = self.leaf_for_read(name)?;
        if leaf.number_of_elements() != 1 {
            return Err(ReadError::NotScalar {
                name: name.to_string(),
                count: leaf.number_of_elements(),
            });
        }
        leaf.get().map_err(|source| ReadError::Conversion {
            name: name.to_string(),
            source,
        })
    }

    /// Reads every element of a leaf as `T`, row-major.
    pub fn read_array<T: FromElement>(&self, name: &str) -> Result<Vec<T>, ReadError> {
        self.leaf_for_read(name)?
            .get_all()
            .map_err(|source| ReadError::Conversion {
                name: name.to_string(),
                source,
            })
    }

    /// Resolves a link leaf: its text is a dotted path from the root.
    pub fn resolve_link(&self, name: &str) -> Result<NodeId, ReadError> {
        let leaf = self.leaf_for_read(name)?;
        let target = match leaf.elements.as_slice() {
            [element] if leaf.type_name == TypeName::String => element.as_str(),
            _ => None,
        }
        .ok_or_else(|| ReadError::NotALink {
            name: name.to_string(),
        })?;
        self.find_from(self.root(), target)
            .ok_or_else(|| ReadError::DanglingLink {
                name: name.to_string(),
                target: target.to_string(),
            })
    }

    fn check_name(name: &str) -> Result<(), SinkError> {
        if name.is_empty() || name.contains('.') {
            return Err(SinkError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn push_child(&mut self, name: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(self.current),
            kind,
        });
        if let NodeKind::Group { children, .. } = &mut self.nodes[self.current.0].kind {
            children.push(id);
        }
        id
    }
}

impl StructuredDataSink for ConfigurationDatabase {
    fn create_child(&mut self, name: &str) -> Result<(), SinkError> {
        Self::check_name(name)?;
        if let Some(existing) = self.child_named(self.current, name) {
            if self.node(existing).is_leaf() {
                return Err(SinkError::LeafInTheWay {
                    name: name.to_string(),
                });
            }
            self.current = existing;
            return Ok(());
        }
        let id = self.push_child(
            name,
            NodeKind::Group {
                children: Vec::new(),
                type_name: None,
            },
        );
        debug!("created group {}", self.path_of(id));
        self.current = id;
        Ok(())
    }

    fn annotate_type(&mut self, type_name: &str) -> Result<(), SinkError> {
        if let NodeKind::Group {
            type_name: annotation,
            ..
        } = &mut self.nodes[self.current.0].kind
        {
            *annotation = Some(type_name.to_string());
        }
        Ok(())
    }

    fn move_to_parent(&mut self, levels: u32) -> Result<(), SinkError> {
        let mut target = self.current;
        for _ in 0..levels {
            target = self.node(target).parent.ok_or_else(|| SinkError::NoAncestor {
                levels,
                path: self.current_path(),
            })?;
        }
        self.current = target;
        Ok(())
    }

    fn move_to_root(&mut self) -> Result<(), SinkError> {
        self.current = self.root();
        Ok(())
    }

    fn write_leaf(&mut self, name: &str, value: LeafValue) -> Result<(), SinkError> {
        Self::check_name(name)?;
        match self.child_named(self.current, name) {
            Some(existing) => {
                let node = &mut self.nodes[existing.0];
                if !node.is_leaf() {
                    return Err(SinkError::GroupInTheWay {
                        name: name.to_string(),
                    });
                }
                node.kind = NodeKind::Leaf(value);
                debug!("overwrote leaf {}", self.path_of(existing));
            }
            None => {
                let id = self.push_child(name, NodeKind::Leaf(value));
                debug!("wrote leaf {}", self.path_of(id));
            }
        }
        Ok(())
    }
}
