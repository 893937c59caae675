use crate::types::LeafValue;
use miette::Diagnostic;
use thiserror::Error;

/// Receiver of the tree built by a parse.
///
/// The sink keeps a cursor: `create_child` moves it into the (possibly new) group,
/// `write_leaf` stores a value under the cursor without moving it.
pub trait StructuredDataSink {
    /// Creates the group `name` under the cursor, or enters it if it already exists.
    fn create_child(&mut self, name: &str) -> Result<(), SinkError>;

    /// Records the type cast declared on the group under the cursor.
    fn annotate_type(&mut self, type_name: &str) -> Result<(), SinkError>;

    fn move_to_parent(&mut self, levels: u32) -> Result<(), SinkError>;

    fn move_to_root(&mut self) -> Result<(), SinkError>;

    /// Creates or overwrites the leaf `name` under the cursor.
    fn write_leaf(&mut self, name: &str, value: LeafValue) -> Result<(), SinkError>;
}

impl<S: StructuredDataSink + ?Sized> StructuredDataSink for &mut S {
    fn create_child(&mut self, name: &str) -> Result<(), SinkError> {
        (**self).create_child(name)
    }

    fn annotate_type(&mut self, type_name: &str) -> Result<(), SinkError> {
        (**self).annotate_type(type_name)
    }

    fn move_to_parent(&mut self, levels: u32) -> Result<(), SinkError> {
        (**self).move_to_parent(levels)
    }

    fn move_to_root(&mut self) -> Result<(), SinkError> {
        (**self).move_to_root()
    }

    fn write_leaf(&mut self, name: &str, value: LeafValue) -> Result<(), SinkError> {
        (**self).write_leaf(name, value)
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("a leaf named '{name}' already exists")]
    #[diagnostic(code(cdb::sink::leaf_in_the_way))]
    LeafInTheWay { name: String },

    #[error("a group named '{name}' already exists")]
    #[diagnostic(code(cdb::sink::group_in_the_way))]
    GroupInTheWay { name: String },

    #[error("cannot move {levels} level(s) up from '{path}'")]
    #[diagnostic(code(cdb::sink::no_ancestor))]
    NoAncestor { levels: u32, path: String },

    #[error("node '{path}' not found")]
    #[diagnostic(code(cdb::sink::not_found))]
    NotFound { path: String },

    #[error("'{name}' is not a valid node name")]
    #[diagnostic(
        code(cdb::sink::invalid_name),
        help("Node names must be non-empty and cannot contain '.'.")
    )]
    InvalidName { name: String },
}
