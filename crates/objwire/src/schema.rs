// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema model: entities, fields and the closed set of wire types.
//!
//! An [`Entity`] is built in two phases so that a schema can refer to itself:
//! the shell (package, name, version, signature) is allocated first, then
//! [`Entity::set_fields`] fills in the field table exactly once.
//!
//! ```text
//! Entity "path.MemoryRange"
//! +-- After:   Pointer(Struct(path.Atom))
//! +-- Pool:    uint64
//! +-- Address: uint64
//! +-- Size:    uint64
//! ```

use crate::dynamic::DynamicObject;
use crate::error::{Error, Result};
use crate::value::Value;
use md5::{Digest, Md5};
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
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
}

impl PrimitiveKind {
    /// Size in bytes on the wire (None for strings).
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::String => None,
        }
    }

    /// Wire code used in type descriptors.
    pub fn code(&self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::I8 => 2,
            Self::I16 => 3,
            Self::I32 => 4,
            Self::I64 => 5,
            Self::U8 => 6,
            Self::U16 => 7,
            Self::U32 => 8,
            Self::U64 => 9,
            Self::F32 => 10,
            Self::F64 => 11,
            Self::String => 12,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Bool,
            2 => Self::I8,
            3 => Self::I16,
            4 => Self::I32,
            5 => Self::I64,
            6 => Self::U8,
            7 => Self::U16,
            8 => Self::U32,
            9 => Self::U64,
            10 => Self::F32,
            11 => Self::F64,
            12 => Self::String,
            _ => return None,
        })
    }

    /// Integer kinds are the only legal enum representations.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::String => "string",
        }
    }
}

/// Enumeration type: an integer primitive with named values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub underlying: PrimitiveKind,
    pub variants: Vec<EnumVariant>,
}

impl EnumType {
    pub fn new(
        name: impl Into<String>,
        underlying: PrimitiveKind,
        variants: Vec<EnumVariant>,
    ) -> Self {
        Self {
            name: name.into(),
            underlying,
            variants,
        }
    }

    /// Get variant by name.
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Get variant by value.
    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Wire type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Fixed-width scalar or length-prefixed string.
    Primitive(PrimitiveKind),
    /// Shared, nullable reference encoded through the object reference table.
    Pointer(Box<Type>),
    /// Inline value laid out by the entity's own fields.
    Struct(Arc<Entity>),
    /// Count-prefixed sequence.
    List(Box<Type>),
    /// Fixed-length sequence, no count on the wire.
    Array(Box<Type>, usize),
    /// Count-prefixed key/value pairs.
    Map(Box<Type>, Box<Type>),
    /// Named integer values.
    Enum(EnumType),
}

impl Type {
    pub fn struct_type(entity: Arc<Entity>) -> Self {
        Type::Struct(entity)
    }

    pub fn pointer(to: Type) -> Self {
        Type::Pointer(Box::new(to))
    }

    /// Shorthand for `Pointer(Struct(entity))`.
    pub fn pointer_to(entity: Arc<Entity>) -> Self {
        Type::pointer(Type::Struct(entity))
    }

    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn array(element: Type, length: usize) -> Self {
        Type::Array(Box::new(element), length)
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// Fixed encoded width, or `None` when it depends on the value.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Type::Primitive(p) => p.size(),
            Type::Enum(e) => e.underlying.size(),
            Type::Array(element, length) => element.fixed_size().map(|s| s * length),
            Type::Struct(entity) => {
                if !entity.is_complete() {
                    return None;
                }
                entity
                    .fields()
                    .iter()
                    .try_fold(0usize, |acc, f| f.ty.fixed_size().map(|s| acc + s))
            }
            Type::Pointer(_) | Type::List(_) | Type::Map(_, _) => None,
        }
    }

    /// Zero value used for blank dynamic objects.
    pub fn zero_value(&self) -> Value {
        match self {
            Type::Primitive(p) => match p {
                PrimitiveKind::Bool => Value::Bool(false),
                PrimitiveKind::I8 => Value::I8(0),
                PrimitiveKind::I16 => Value::I16(0),
                PrimitiveKind::I32 => Value::I32(0),
                PrimitiveKind::I64 => Value::I64(0),
                PrimitiveKind::U8 => Value::U8(0),
                PrimitiveKind::U16 => Value::U16(0),
                PrimitiveKind::U32 => Value::U32(0),
                PrimitiveKind::U64 => Value::U64(0),
                PrimitiveKind::F32 => Value::F32(0.0),
                PrimitiveKind::F64 => Value::F64(0.0),
                PrimitiveKind::String => Value::String(String::new()),
            },
            Type::Pointer(_) => Value::Object(None),
            Type::Struct(entity) => Value::Struct(DynamicObject::blank(entity.clone())),
            Type::List(_) => Value::List(Vec::new()),
            Type::Array(element, length) => {
                Value::Array((0..*length).map(|_| element.zero_value()).collect())
            }
            Type::Map(_, _) => Value::Map(Vec::new()),
            Type::Enum(e) => Value::Enum(e.variants.first().map(|v| v.value).unwrap_or(0)),
        }
    }

    /// Arrays of zero-width elements carry no bytes on the wire, so their
    /// length could not be bounded by the stream size.
    fn has_zero_width_array(&self) -> bool {
        match self {
            Type::Array(element, _) => {
                element.fixed_size() == Some(0) || element.has_zero_width_array()
            }
            Type::Pointer(inner) | Type::List(inner) => inner.has_zero_width_array(),
            Type::Map(key, value) => key.has_zero_width_array() || value.has_zero_width_array(),
            _ => false,
        }
    }

    /// True if `target` is reachable without a Pointer/List/Map indirection.
    fn embeds(&self, target: *const Entity, visited: &mut Vec<*const Entity>) -> bool {
        match self {
            Type::Struct(entity) => {
                let ptr = Arc::as_ptr(entity);
                if ptr == target {
                    return true;
                }
                if visited.contains(&ptr) {
                    return false;
                }
                visited.push(ptr);
                entity.fields().iter().any(|f| f.ty.embeds(target, visited))
            }
            Type::Array(element, _) => element.embeds(target, visited),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::Pointer(to) => write!(f, "*{}", to),
            Type::Struct(entity) => write!(f, "{}", entity.qualified_name()),
            Type::List(element) => write!(f, "[]{}", element),
            Type::Array(element, length) => write!(f, "[{}]{}", length, element),
            Type::Map(key, value) => write!(f, "map[{}]{}", key, value),
            Type::Enum(e) => {
                write!(f, "enum {}({}){{", e.name, e.underlying.name())?;
                for (i, v) in e.variants.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", v.name, v.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Named, typed member of an entity. Order is wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Registered schema describing one object type's wire layout.
pub struct Entity {
    package: String,
    name: String,
    version: String,
    signature: OnceLock<String>,
    fields: OnceLock<Vec<Field>>,
}

impl Entity {
    /// Allocate an entity shell. An empty `signature` is derived from the
    /// field layout when the fields are set.
    pub fn new(
        package: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        signature: impl Into<String>,
    ) -> Arc<Self> {
        let signature = signature.into();
        let cell = OnceLock::new();
        if !signature.is_empty() {
            let _ = cell.set(signature);
        }
        Arc::new(Self {
            package: package.into(),
            name: name.into(),
            version: version.into(),
            signature: cell,
            fields: OnceLock::new(),
        })
    }

    /// Allocate and complete an entity in one step.
    pub fn with_fields(
        package: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        signature: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<Arc<Self>> {
        let entity = Self::new(package, name, version, signature);
        entity.set_fields(fields)?;
        Ok(entity)
    }

    /// Second construction phase. Fails if the fields were already set or if
    /// a field would contain this entity by value.
    pub fn set_fields(&self, fields: Vec<Field>) -> Result<()> {
        if self.is_complete() {
            return Err(Error::Schema(format!(
                "fields of {} already set",
                self.qualified_name()
            )));
        }
        let me: *const Entity = self;
        for field in &fields {
            if field.ty.embeds(me, &mut Vec::new()) {
                return Err(Error::Schema(format!(
                    "{}.{} contains {} by value",
                    self.qualified_name(),
                    field.name,
                    self.qualified_name()
                )));
            }
            if field.ty.has_zero_width_array() {
                return Err(Error::Schema(format!(
                    "{}.{} is an array of zero-width elements",
                    self.qualified_name(),
                    field.name
                )));
            }
        }
        if self.signature.get().is_none() {
            let _ = self.signature.set(self.derive_signature(&fields));
        }
        self.fields
            .set(fields)
            .map_err(|_| Error::Schema(format!("fields of {} already set", self.qualified_name())))
    }

    fn derive_signature(&self, fields: &[Field]) -> String {
        let mut layout = String::new();
        for field in fields {
            let _ = write!(layout, "{}:{};", field.name, field.ty);
        }
        let digest = Md5::digest(layout.as_bytes());
        let mut hex = String::with_capacity(16);
        for byte in &digest[..8] {
            let _ = write!(hex, "{:02x}", byte);
        }
        if self.version.is_empty() {
            format!("{}#{}", self.qualified_name(), hex)
        } else {
            format!("{}@{}#{}", self.qualified_name(), self.version, hex)
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Stable identity string. Empty until the fields are set when derived.
    pub fn signature(&self) -> &str {
        self.signature.get().map(String::as_str).unwrap_or("")
    }

    /// `package.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn is_complete(&self) -> bool {
        self.fields.get().is_some()
    }

    /// Field table (empty until set).
    pub fn fields(&self) -> &[Field] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name == name)
    }
}

// Field types may point back at their own entity, so Debug/PartialEq stop at
// the signature instead of walking the graph.
impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.qualified_name())
            .field("version", &self.version)
            .field("signature", &self.signature())
            .field("fields", &self.fields().len())
            .finish()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        if self.signature().is_empty() || other.signature().is_empty() {
            return std::ptr::eq(self, other);
        }
        self.signature() == other.signature()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] {{", self.qualified_name(), self.signature())?;
        for field in self.fields() {
            writeln!(f, "    {}: {}", field.name, field.ty)?;
        }
        write!(f, "}}")
    }
}
