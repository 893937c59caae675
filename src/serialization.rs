use crate::database::{ConfigurationDatabase, NodeId, NodeKind};
use crate::types::{Element, LeafValue, Shape};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Plain data view of a configuration tree, for JSON/YAML export.
///
/// Objects keep the children of a group in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Unsigned(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Converts the sub-tree at `node`.
///
/// The conversion, serialization and drop of the result each recurse once per group
/// level, so exporting trees nested tens of thousands of levels deep needs a larger
/// stack than the default.
pub(crate) fn to_value(db: &ConfigurationDatabase, node: NodeId) -> Value {
    match &db.node(node).kind {
        NodeKind::Leaf(leaf) => leaf_to_value(leaf),
        NodeKind::Group { children, .. } => Value::Object(
            children
                .iter()
                .map(|child| (db.node(*child).name.clone(), to_value(db, *child)))
                .collect(),
        ),
    }
}

fn leaf_to_value(leaf: &LeafValue) -> Value {
    let elements: Vec<Value> = leaf.elements.iter().map(element_to_value).collect();
    match leaf.shape {
        Shape::Scalar => elements
            .into_iter()
            .next()
            .unwrap_or(Value::Array(Vec::new())),
        Shape::Vector(_) => Value::Array(elements),
        Shape::Matrix { columns, .. } => Value::Array(
            elements
                .chunks(columns.max(1) as usize)
                .map(|row| Value::Array(row.to_vec()))
                .collect(),
        ),
    }
}

fn element_to_value(element: &Element) -> Value {
    match element {
        Element::String(s) => Value::String(s.clone()),
        Element::Int8(v) => Value::Integer(i64::from(*v)),
        Element::Int16(v) => Value::Integer(i64::from(*v)),
        Element::Int32(v) => Value::Integer(i64::from(*v)),
        Element::Int64(v) => Value::Integer(*v),
        Element::UInt8(v) => Value::Unsigned(u64::from(*v)),
        Element::UInt16(v) => Value::Unsigned(u64::from(*v)),
        Element::UInt32(v) => Value::Unsigned(u64::from(*v)),
        Element::UInt64(v) => Value::Unsigned(*v),
        Element::Float32(v) => Value::Float(f64::from(*v)),
        Element::Float64(v) => Value::Float(*v),
    }
}

impl ConfigurationDatabase {
    /// The whole tree as a [`Value`], from the root, children in declaration order.
    ///
    /// Recurses once per group level.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_value(self, self.root())
    }
}

impl Serialize for ConfigurationDatabase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}
