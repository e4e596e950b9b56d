// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture path types.
//!
//! A path addresses a piece of state inside a GPU capture: an atom (command)
//! index, a memory range observed after that atom, and a typed view of that
//! range. These are the reference concrete types of the protocol, laid out
//! the way generated code implements [`BinaryType`]: one static entity per
//! type, typed accessors, and `encode`/`decode` bodies that walk the fields
//! in declared order.
//!
//! ```text
//! TypedMemoryPath
//! +-- Range: *MemoryRangePath  (shared, may be null)
//! |          +-- After: *AtomPath
//! +-- Type:  memory.Type       (inline struct)
//! ```

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::object::{BinaryObject, BinaryType, Shared};
use crate::registry::EntityRegistry;
use crate::schema::{EnumType, EnumVariant, Entity, Field, PrimitiveKind, Type};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

fn static_entity(package: &str, name: &str, fields: Vec<Field>) -> Arc<Entity> {
    Entity::with_fields(package, name, "", "", fields)
        .expect("built-in path schema must be valid")
}

fn shared_eq<T: PartialEq>(a: &Option<Shared<T>>, b: &Option<Shared<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
        _ => false,
    }
}

/// Navigable position inside a capture.
pub trait Path: BinaryObject {
    /// Text of this path's own segment.
    fn segment_string(&self) -> String;

    /// The atom this path is relative to, if any.
    fn parent(&self) -> Option<Shared<AtomPath>>;

    /// Full dotted path from the root.
    fn path_string(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}.{}", parent.read().path_string(), self.segment_string()),
            None => self.segment_string(),
        }
    }
}

// ============================================================================
// AtomPath
// ============================================================================

/// Index of a single atom in the capture's command list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomPath {
    pub index: u64,
}

impl AtomPath {
    pub fn new(index: u64) -> Self {
        Self { index }
    }
}

impl Path for AtomPath {
    fn segment_string(&self) -> String {
        format!("Atoms[{}]", self.index)
    }

    fn parent(&self) -> Option<Shared<AtomPath>> {
        None
    }
}

impl BinaryObject for AtomPath {
    fn entity(&self) -> Arc<Entity> {
        Self::class_entity()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.write_u64(self.index)
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.index = d.read_u64()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinaryType for AtomPath {
    fn class_entity() -> Arc<Entity> {
        static ENTITY: OnceLock<Arc<Entity>> = OnceLock::new();
        ENTITY
            .get_or_init(|| {
                static_entity(
                    "path",
                    "Atom",
                    vec![Field::new("Index", Type::Primitive(PrimitiveKind::U64))],
                )
            })
            .clone()
    }
}

// ============================================================================
// MemoryRangePath
// ============================================================================

/// Range of application memory as observed immediately after an atom.
#[derive(Debug, Clone, Default)]
pub struct MemoryRangePath {
    after: Option<Shared<AtomPath>>,
    pool: u64,
    address: u64,
    size: u64,
}

impl MemoryRangePath {
    pub fn new(after: Option<Shared<AtomPath>>, pool: u64, address: u64, size: u64) -> Self {
        Self {
            after,
            pool,
            address,
            size,
        }
    }

    pub fn after(&self) -> Option<&Shared<AtomPath>> {
        self.after.as_ref()
    }

    pub fn set_after(&mut self, after: Option<Shared<AtomPath>>) -> &mut Self {
        self.after = after;
        self
    }

    pub fn pool(&self) -> u64 {
        self.pool
    }

    pub fn set_pool(&mut self, pool: u64) -> &mut Self {
        self.pool = pool;
        self
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn set_address(&mut self, address: u64) -> &mut Self {
        self.address = address;
        self
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_size(&mut self, size: u64) -> &mut Self {
        self.size = size;
        self
    }
}

impl PartialEq for MemoryRangePath {
    fn eq(&self, other: &Self) -> bool {
        self.pool == other.pool
            && self.address == other.address
            && self.size == other.size
            && shared_eq(&self.after, &other.after)
    }
}

impl Path for MemoryRangePath {
    fn segment_string(&self) -> String {
        format!("MemoryRange<{}:{:#x}[{}]>", self.pool, self.address, self.size)
    }

    fn parent(&self) -> Option<Shared<AtomPath>> {
        self.after.clone()
    }
}

impl BinaryObject for MemoryRangePath {
    fn entity(&self) -> Arc<Entity> {
        Self::class_entity()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.shared(self.after.as_ref())?;
        e.write_u64(self.pool)?;
        e.write_u64(self.address)?;
        e.write_u64(self.size)
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.after = d.object_as::<AtomPath>()?;
        self.pool = d.read_u64()?;
        self.address = d.read_u64()?;
        self.size = d.read_u64()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinaryType for MemoryRangePath {
    fn class_entity() -> Arc<Entity> {
        static ENTITY: OnceLock<Arc<Entity>> = OnceLock::new();
        ENTITY
            .get_or_init(|| {
                let u64_field = |name: &str| Field::new(name, Type::Primitive(PrimitiveKind::U64));
                static_entity(
                    "path",
                    "MemoryRange",
                    vec![
                        Field::new("After", Type::pointer_to(AtomPath::class_entity())),
                        u64_field("Pool"),
                        u64_field("Address"),
                        u64_field("Size"),
                    ],
                )
            })
            .clone()
    }
}

// ============================================================================
// MemoryType
// ============================================================================

/// Broad category of a memory element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemoryKind {
    #[default]
    Unknown = 0,
    Integer = 1,
    Float = 2,
    Pointer = 3,
    Char = 4,
}

impl MemoryKind {
    const ALL: [MemoryKind; 5] = [
        MemoryKind::Unknown,
        MemoryKind::Integer,
        MemoryKind::Float,
        MemoryKind::Pointer,
        MemoryKind::Char,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| *k as u32 == value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Pointer => "Pointer",
            Self::Char => "Char",
        }
    }

    /// Schema enum descriptor.
    pub fn enum_type() -> EnumType {
        EnumType::new(
            "MemoryKind",
            PrimitiveKind::U32,
            Self::ALL
                .iter()
                .map(|k| EnumVariant::new(k.name(), i64::from(*k as u32)))
                .collect(),
        )
    }
}

/// Element type used to interpret a memory range. Encoded inline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryType {
    pub kind: MemoryKind,
    pub byte_size: u32,
    pub signed: bool,
}

impl MemoryType {
    pub fn new(kind: MemoryKind, byte_size: u32, signed: bool) -> Self {
        Self {
            kind,
            byte_size,
            signed,
        }
    }

    pub fn integer(byte_size: u32, signed: bool) -> Self {
        Self::new(MemoryKind::Integer, byte_size, signed)
    }

    pub fn float(byte_size: u32) -> Self {
        Self::new(MemoryKind::Float, byte_size, true)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.byte_size * 8;
        match self.kind {
            MemoryKind::Integer if self.signed => write!(f, "int{}", bits),
            MemoryKind::Integer => write!(f, "uint{}", bits),
            MemoryKind::Float => write!(f, "float{}", bits),
            MemoryKind::Pointer => write!(f, "ptr{}", bits),
            MemoryKind::Char => write!(f, "char{}", bits),
            MemoryKind::Unknown => write!(f, "?{}", bits),
        }
    }
}

impl BinaryObject for MemoryType {
    fn entity(&self) -> Arc<Entity> {
        Self::class_entity()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.write_u32(self.kind as u32)?;
        e.write_u32(self.byte_size)?;
        e.write_bool(self.signed)
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        let kind = d.read_u32()?;
        self.kind = MemoryKind::from_u32(kind)
            .ok_or_else(|| Error::Malformed(format!("invalid MemoryKind {}", kind)))?;
        self.byte_size = d.read_u32()?;
        self.signed = d.read_bool()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinaryType for MemoryType {
    fn class_entity() -> Arc<Entity> {
        static ENTITY: OnceLock<Arc<Entity>> = OnceLock::new();
        ENTITY
            .get_or_init(|| {
                static_entity(
                    "memory",
                    "Type",
                    vec![
                        Field::new("Kind", Type::Enum(MemoryKind::enum_type())),
                        Field::new("ByteSize", Type::Primitive(PrimitiveKind::U32)),
                        Field::new("Signed", Type::Primitive(PrimitiveKind::Bool)),
                    ],
                )
            })
            .clone()
    }
}

// ============================================================================
// TypedMemoryPath
// ============================================================================

/// A memory range interpreted as elements of one [`MemoryType`].
#[derive(Debug, Clone, Default)]
pub struct TypedMemoryPath {
    range: Option<Shared<MemoryRangePath>>,
    ty: MemoryType,
}

impl TypedMemoryPath {
    pub fn new(range: Option<Shared<MemoryRangePath>>, ty: MemoryType) -> Self {
        Self { range, ty }
    }

    pub fn range(&self) -> Option<&Shared<MemoryRangePath>> {
        self.range.as_ref()
    }

    pub fn set_range(&mut self, range: Option<Shared<MemoryRangePath>>) -> &mut Self {
        self.range = range;
        self
    }

    pub fn memory_type(&self) -> &MemoryType {
        &self.ty
    }

    pub fn set_memory_type(&mut self, ty: MemoryType) -> &mut Self {
        self.ty = ty;
        self
    }
}

impl PartialEq for TypedMemoryPath {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && shared_eq(&self.range, &other.range)
    }
}

impl Path for TypedMemoryPath {
    fn segment_string(&self) -> String {
        format!("Type<{}>", self.ty)
    }

    fn parent(&self) -> Option<Shared<AtomPath>> {
        self.range.as_ref().and_then(|r| r.read().parent())
    }

    fn path_string(&self) -> String {
        match &self.range {
            Some(range) => format!("{}.{}", range.read().path_string(), self.segment_string()),
            None => self.segment_string(),
        }
    }
}

impl BinaryObject for TypedMemoryPath {
    fn entity(&self) -> Arc<Entity> {
        Self::class_entity()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.shared(self.range.as_ref())?;
        e.value(&self.ty)
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.range = d.object_as::<MemoryRangePath>()?;
        self.ty = MemoryType::default();
        d.value(&mut self.ty)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinaryType for TypedMemoryPath {
    fn class_entity() -> Arc<Entity> {
        static ENTITY: OnceLock<Arc<Entity>> = OnceLock::new();
        ENTITY
            .get_or_init(|| {
                static_entity(
                    "path",
                    "TypedMemory",
                    vec![
                        Field::new("Range", Type::pointer_to(MemoryRangePath::class_entity())),
                        Field::new("Type", Type::struct_type(MemoryType::class_entity())),
                    ],
                )
            })
            .clone()
    }
}

/// Register the path classes so decoded streams materialize concrete types.
pub fn register_types(registry: &EntityRegistry) -> Result<()> {
    registry.register_class(AtomPath::class())?;
    registry.register_class(MemoryRangePath::class())?;
    registry.register_class(MemoryType::class())?;
    registry.register_class(TypedMemoryPath::class())?;
    Ok(())
}

/// Register only the path schemas; objects decode as dynamic objects.
pub fn register_schemas(registry: &EntityRegistry) -> Result<()> {
    registry.register(AtomPath::class_entity())?;
    registry.register(MemoryRangePath::class_entity())?;
    registry.register(MemoryType::class_entity())?;
    registry.register(TypedMemoryPath::class_entity())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::from_bytes_with;
    use crate::encoder::to_bytes;
    use crate::object::{shared, ObjectRef};

    fn sample() -> TypedMemoryPath {
        let atom = shared(AtomPath::new(12));
        let range = MemoryRangePath::new(Some(atom), 0, 0x1000, 64);
        TypedMemoryPath::new(Some(shared(range)), MemoryType::integer(4, false))
    }

    #[test]
    fn test_entities_are_static() {
        assert!(Arc::ptr_eq(
            &TypedMemoryPath::class_entity(),
            &TypedMemoryPath::default().entity()
        ));
        let sig = TypedMemoryPath::class_entity().signature().to_string();
        assert!(sig.starts_with("path.TypedMemory#"), "{}", sig);
        assert_ne!(sig, MemoryRangePath::class_entity().signature());
    }

    #[test]
    fn test_segment_and_parent() {
        let path = sample();
        assert_eq!(path.segment_string(), "Type<uint32>");
        assert_eq!(path.parent().map(|a| a.read().index), Some(12));
        assert_eq!(
            path.path_string(),
            "Atoms[12].MemoryRange<0:0x1000[64]>.Type<uint32>"
        );
        assert!(TypedMemoryPath::default().parent().is_none());
    }

    #[test]
    fn test_memory_type_display() {
        assert_eq!(MemoryType::integer(2, true).to_string(), "int16");
        assert_eq!(MemoryType::float(8).to_string(), "float64");
        assert_eq!(MemoryType::new(MemoryKind::Char, 1, false).to_string(), "char8");
    }

    #[test]
    fn test_typed_round_trip() {
        let reg = EntityRegistry::new();
        register_types(&reg).unwrap();

        let original = sample();
        let bytes = to_bytes(&ObjectRef::new(original.clone())).unwrap();
        let decoded = from_bytes_with(&bytes, &reg).unwrap().unwrap();
        let decoded = decoded.downcast::<TypedMemoryPath>().expect("TypedMemoryPath");
        assert_eq!(*decoded.read(), original);
    }

    #[test]
    fn test_invalid_memory_kind() {
        let reg = EntityRegistry::new();
        register_types(&reg).unwrap();

        let bytes = to_bytes(&ObjectRef::new(sample())).unwrap();
        // Kind is the first inline field after the nested range; locate it
        // from the end: Kind(4) ByteSize(4) Signed(1).
        let mut corrupted = bytes.clone();
        let at = corrupted.len() - 9;
        corrupted[at..at + 4].copy_from_slice(&99u32.to_le_bytes());
        let err = from_bytes_with(&corrupted, &reg).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_register_schemas_only() {
        let reg = EntityRegistry::new();
        register_schemas(&reg).unwrap();
        assert_eq!(reg.len(), 4);
        assert!(reg.class(AtomPath::class_entity().signature()).is_none());
        assert!(reg.lookup_name("memory", "Type").is_some());
    }
}
