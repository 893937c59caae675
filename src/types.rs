use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The element types a value can be cast to with `(type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    #[default]
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float32,
    Float64,
}

impl TypeName {
    pub const ALL: [TypeName; 11] = [
        TypeName::String,
        TypeName::Int8,
        TypeName::Int16,
        TypeName::Int32,
        TypeName::Int64,
        TypeName::UInt8,
        TypeName::UInt16,
        TypeName::UInt32,
        TypeName::UInt64,
        TypeName::Float32,
        TypeName::Float64,
    ];

    /// Looks a cast name up. Names are case-sensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<TypeName> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::String => "string",
            TypeName::Int8 => "int8",
            TypeName::Int16 => "int16",
            TypeName::Int32 => "int32",
            TypeName::Int64 => "int64",
            TypeName::UInt8 => "uint8",
            TypeName::UInt16 => "uint16",
            TypeName::UInt32 => "uint32",
            TypeName::UInt64 => "uint64",
            TypeName::Float32 => "float32",
            TypeName::Float64 => "float64",
        }
    }

    /// Size of one element in bytes; `None` for variable-length strings.
    #[must_use]
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            TypeName::String => None,
            TypeName::Int8 | TypeName::UInt8 => Some(1),
            TypeName::Int16 | TypeName::UInt16 => Some(2),
            TypeName::Int32 | TypeName::UInt32 | TypeName::Float32 => Some(4),
            TypeName::Int64 | TypeName::UInt64 | TypeName::Float64 => Some(8),
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        *self != TypeName::String
    }

    /// Converts token text into an element of this type.
    pub fn convert(&self, text: &str) -> Result<Element, ConversionError> {
        let element = match self {
            TypeName::String => Some(Element::String(text.to_string())),
            TypeName::Int8 => i8::from_text(text).map(Element::Int8),
            TypeName::Int16 => i16::from_text(text).map(Element::Int16),
            TypeName::Int32 => i32::from_text(text).map(Element::Int32),
            TypeName::Int64 => i64::from_text(text).map(Element::Int64),
            TypeName::UInt8 => u8::from_text(text).map(Element::UInt8),
            TypeName::UInt16 => u16::from_text(text).map(Element::UInt16),
            TypeName::UInt32 => u32::from_text(text).map(Element::UInt32),
            TypeName::UInt64 => u64::from_text(text).map(Element::UInt64),
            TypeName::Float32 => f32::from_text(text).map(Element::Float32),
            TypeName::Float64 => f64::from_text(text).map(Element::Float64),
        };
        element.ok_or_else(|| ConversionError {
            value: text.to_string(),
            type_name: *self,
        })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("cannot convert '{value}' to {type_name}")]
#[diagnostic(code(cdb::conversion))]
pub struct ConversionError {
    pub value: String,
    pub type_name: TypeName,
}

/// One typed element of a leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Element {
    String(String),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Element {
    #[must_use]
    pub fn type_name(&self) -> TypeName {
        match self {
            Element::String(_) => TypeName::String,
            Element::Int8(_) => TypeName::Int8,
            Element::Int16(_) => TypeName::Int16,
            Element::Int32(_) => TypeName::Int32,
            Element::Int64(_) => TypeName::Int64,
            Element::UInt8(_) => TypeName::UInt8,
            Element::UInt16(_) => TypeName::UInt16,
            Element::UInt32(_) => TypeName::UInt32,
            Element::UInt64(_) => TypeName::UInt64,
            Element::Float32(_) => TypeName::Float32,
            Element::Float64(_) => TypeName::Float64,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::String(v) => f.write_str(v),
            Element::Int8(v) => write!(f, "{v}"),
            Element::Int16(v) => write!(f, "{v}"),
            Element::Int32(v) => write!(f, "{v}"),
            Element::Int64(v) => write!(f, "{v}"),
            Element::UInt8(v) => write!(f, "{v}"),
            Element::UInt16(v) => write!(f, "{v}"),
            Element::UInt32(v) => write!(f, "{v}"),
            Element::UInt64(v) => write!(f, "{v}"),
            Element::Float32(v) => write!(f, "{v}"),
            Element::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// Layout of a leaf's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shape {
    Scalar,
    Vector(u32),
    Matrix { rows: u32, columns: u32 },
}

impl Shape {
    #[must_use]
    pub fn element_count(&self) -> usize {
        match *self {
            Shape::Scalar => 1,
            Shape::Vector(n) => n as usize,
            Shape::Matrix { rows, columns } => rows as usize * columns as usize,
        }
    }

    /// 0 for scalars, 1 for vectors, 2 for matrices.
    #[must_use]
    pub fn dimensions(&self) -> u8 {
        match self {
            Shape::Scalar => 0,
            Shape::Vector(_) => 1,
            Shape::Matrix { .. } => 2,
        }
    }
}

/// The value held by a leaf node. Matrix elements are stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafValue {
    pub type_name: TypeName,
    pub shape: Shape,
    pub elements: Vec<Element>,
}

impl LeafValue {
    pub fn new(type_name: TypeName, shape: Shape, elements: Vec<Element>) -> Self {
        LeafValue {
            type_name,
            shape,
            elements,
        }
    }

    /// A scalar string leaf.
    pub fn string(text: impl Into<String>) -> Self {
        LeafValue::new(
            TypeName::String,
            Shape::Scalar,
            vec![Element::String(text.into())],
        )
    }

    #[must_use]
    pub fn number_of_elements(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.shape == Shape::Scalar
    }

    /// Reads the first element as `T`.
    pub fn get<T: FromElement>(&self) -> Result<T, ConversionError> {
        match self.elements.first() {
            Some(element) => T::from_element(element),
            None => Err(ConversionError {
                value: String::new(),
                type_name: T::TYPE_NAME,
            }),
        }
    }

    /// Reads every element as `T`, row-major.
    pub fn get_all<T: FromElement>(&self) -> Result<Vec<T>, ConversionError> {
        self.elements.iter().map(T::from_element).collect()
    }

    /// Reads the element at `row`, `column` of a matrix, or at index `column` of a vector.
    pub fn get_at<T: FromElement>(&self, row: u32, column: u32) -> Option<Result<T, ConversionError>> {
        let index = match self.shape {
            Shape::Scalar if row == 0 && column == 0 => 0,
            Shape::Vector(n) if row == 0 && column < n => column as usize,
            Shape::Matrix { rows, columns } if row < rows && column < columns => {
                row as usize * columns as usize + column as usize
            }
            _ => return None,
        };
        self.elements.get(index).map(T::from_element)
    }
}

/// Rust types a stored element can be read back as.
///
/// Elements stored as strings are converted on demand; typed elements go through
/// their textual form, so a range check applies to every read.
pub trait FromElement: Sized {
    const TYPE_NAME: TypeName;

    fn from_text(text: &str) -> Option<Self>;

    fn from_element(element: &Element) -> Result<Self, ConversionError> {
        let converted = match element {
            Element::String(s) => Self::from_text(s),
            other => Self::from_text(&other.to_string()),
        };
        converted.ok_or_else(|| ConversionError {
            value: element.to_string(),
            type_name: Self::TYPE_NAME,
        })
    }
}

enum IntLiteral {
    Decimal(i128),
    /// Unsigned `0x` literal, applied as a bit pattern of the target width.
    Bits(u64),
}

fn parse_int_literal(text: &str) -> Option<IntLiteral> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let bits = u64::from_str_radix(hex, 16).ok()?;
        return Some(if negative {
            IntLiteral::Decimal(-i128::from(bits))
        } else {
            IntLiteral::Bits(bits)
        });
    }
    if body.starts_with(['+', '-']) {
        return None;
    }
    let magnitude: i128 = body.parse().ok()?;
    Some(IntLiteral::Decimal(if negative { -magnitude } else { magnitude }))
}

macro_rules! integer_from_element {
    ($($int:ty => $bits:ty, $name:expr);* $(;)?) => {
        $(
            impl FromElement for $int {
                const TYPE_NAME: TypeName = $name;

                #[allow(clippy::cast_possible_wrap)]
                fn from_text(text: &str) -> Option<Self> {
                    match parse_int_literal(text.trim())? {
                        IntLiteral::Decimal(v) => <$int>::try_from(v).ok(),
                        IntLiteral::Bits(bits) => <$bits>::try_from(bits).ok().map(|b| b as $int),
                    }
                }
            }
        )*
    };
}

integer_from_element! {
    i8 => u8, TypeName::Int8;
    i16 => u16, TypeName::Int16;
    i32 => u32, TypeName::Int32;
    i64 => u64, TypeName::Int64;
    u8 => u8, TypeName::UInt8;
    u16 => u16, TypeName::UInt16;
    u32 => u32, TypeName::UInt32;
    u64 => u64, TypeName::UInt64;
}

impl FromElement for f64 {
    const TYPE_NAME: TypeName = TypeName::Float64;

    #[allow(clippy::cast_precision_loss)]
    fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(v) = text.parse::<f64>() {
            return Some(v);
        }
        match parse_int_literal(text)? {
            IntLiteral::Decimal(v) => Some(v as f64),
            IntLiteral::Bits(bits) => Some(bits as f64),
        }
    }
}

impl FromElement for f32 {
    const TYPE_NAME: TypeName = TypeName::Float32;

    #[allow(clippy::cast_possible_truncation)]
    fn from_text(text: &str) -> Option<Self> {
        let wide = f64::from_text(text)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return None;
        }
        Some(wide as f32)
    }
}

impl FromElement for String {
    const TYPE_NAME: TypeName = TypeName::String;

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}
