//! Model descriptors: the read-only view of a mapped entity that backends
//! consume to generate DDL, bind values and scan rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tag::{keys, PrimaryKey, Tag};
use crate::value::{DbTimestamp, HostValue};

/// Static host type of a mapped field.
///
/// A closed set of variants plus `Custom` for types a backend declares
/// itself (json, uuid, decimal, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Timestamp,
    Custom(String),
}

/// Host type family, the granularity at which transforms are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostKind {
    Boolean,
    Integer,
    Unsigned,
    Float,
    String,
    Bytes,
    Timestamp,
    Custom,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Unsigned => "unsigned",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FieldType {
    pub fn kind(&self) -> HostKind {
        match self {
            Self::Bool => HostKind::Boolean,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => HostKind::Integer,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => HostKind::Unsigned,
            Self::F32 | Self::F64 => HostKind::Float,
            Self::String => HostKind::String,
            Self::Bytes => HostKind::Bytes,
            Self::Timestamp => HostKind::Timestamp,
            Self::Custom(_) => HostKind::Custom,
        }
    }

    /// Signed or unsigned integer.
    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), HostKind::Integer | HostKind::Unsigned)
    }

    /// Inclusive value range of signed integer types.
    pub fn signed_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Largest value of unsigned integer types.
    pub fn unsigned_max(&self) -> Option<u64> {
        match self {
            Self::U8 => Some(u8::MAX as u64),
            Self::U16 => Some(u16::MAX as u64),
            Self::U32 => Some(u32::MAX as u64),
            Self::U64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Zero value a non-nullable field takes when the column is NULL.
    pub fn zero_value(&self) -> HostValue {
        match self {
            Self::Bool => HostValue::Bool(false),
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => HostValue::Int(0),
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => HostValue::UInt(0),
            Self::F32 | Self::F64 => HostValue::Float(0.0),
            Self::String => HostValue::String(String::new()),
            Self::Bytes => HostValue::Bytes(Vec::new()),
            Self::Timestamp => HostValue::Timestamp(DbTimestamp::epoch()),
            Self::Custom(name) => HostValue::custom(name.clone(), String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    /// Any name that is not a built-in type becomes `Custom`; whether a
    /// backend supports it is decided at resolution time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "timestamp" => Self::Timestamp,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        match raw.parse() {
            Ok(ty) => Ok(ty),
            Err(never) => match never {},
        }
    }
}

/// One mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    ty: FieldType,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    tag: Tag,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            tag: Tag::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Column name: the `column` tag override, or the field name.
    pub fn column_name(&self) -> &str {
        match self.tag.value(keys::COLUMN) {
            Some(column) if !column.is_empty() => column,
            _ => &self.name,
        }
    }

    /// Primary key declaration; an invalid declaration reads as none here
    /// and is reported by the type resolver.
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        self.tag.primary_key().ok().flatten()
    }
}

/// Read-only descriptor of one mapped entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    table: String,
    fields: Vec<Field>,
}

impl Model {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key().is_some())
    }

    /// Primary key field whose values the engine generates.
    pub fn auto_key(&self) -> Option<&Field> {
        self.primary_key()
            .filter(|f| f.primary_key() == Some(PrimaryKey::Auto))
    }

    /// Fields an INSERT binds: everything except an engine generated key.
    pub fn insertable_fields(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.primary_key() != Some(PrimaryKey::Auto))
            .collect()
    }
}
