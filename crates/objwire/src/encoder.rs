// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object graph encoder.
//!
//! # Stream layout
//!
//! ```text
//! object   := u32 id                      (0 = null)
//!           | u32 id entity fields...     (first occurrence of id)
//! entity   := u8 0x00 string signature                    (reference)
//!           | u8 0x01 string package string name
//!             string version string signature
//!             u32 count (string name, type)*              (inline schema)
//! ```
//!
//! Ids are assigned from 1 in first-visit order. The id is recorded before
//! the object's fields are written, so a field pointing back at an ancestor
//! resolves to the ancestor's id instead of recursing.
//!
//! Any error poisons the encoder: the bytes already written may end inside an
//! object record, so later calls fail instead of extending a broken stream.

use crate::config::{
    EncoderConfig, ENTITY_INLINE, ENTITY_REFERENCE, NULL_ID, TYPE_ARRAY, TYPE_ENUM, TYPE_LIST,
    TYPE_MAP, TYPE_POINTER, TYPE_PRIMITIVE, TYPE_STRUCT,
};
use crate::error::{Error, Result};
use crate::object::{BinaryObject, ObjectRef, Shared};
use crate::schema::{Entity, PrimitiveKind, Type};
use crate::value::Value;
use crate::wire::WireWriter;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

/// What the encoder is currently emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Idle,
    WritingEntity,
    WritingValue,
}

/// Per-stream counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStats {
    /// Objects written in full.
    pub objects: u64,
    /// References to objects already written.
    pub back_references: u64,
    /// Null references.
    pub nulls: u64,
    /// Schemas inlined.
    pub schemas: u64,
    pub bytes_written: u64,
}

/// Stream encoder. One reference table per instance.
pub struct Encoder<'a> {
    out: WireWriter<&'a mut dyn Write>,
    config: EncoderConfig,
    // Keeps every written object alive so its address cannot be reused by a
    // different object within this stream. The entity is kept so pointer
    // targets can be checked without locking an object being written.
    objects: HashMap<usize, (u32, ObjectRef, Arc<Entity>)>,
    schemas: HashSet<String>,
    state: EncoderState,
    depth: usize,
    stats: EncoderStats,
    poisoned: bool,
}

impl<'a> Encoder<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self::with_config(out, EncoderConfig::default())
    }

    pub fn with_config(out: &'a mut dyn Write, config: EncoderConfig) -> Self {
        Self {
            out: WireWriter::new(out),
            config,
            objects: HashMap::new(),
            schemas: HashSet::new(),
            state: EncoderState::Idle,
            depth: 0,
            stats: EncoderStats::default(),
            poisoned: false,
        }
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            bytes_written: self.out.bytes_written(),
            ..self.stats
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()
    }

    /// True once a call has failed on this stream.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Write a nullable shared object (pointer semantics).
    pub fn object(&mut self, obj: Option<&ObjectRef>) -> Result<()> {
        self.guarded(|e| e.write_object(obj))
    }

    fn write_object(&mut self, obj: Option<&ObjectRef>) -> Result<()> {
        let Some(obj) = obj else {
            self.stats.nulls += 1;
            return self.out.write_u32(NULL_ID);
        };

        let key = obj.identity();
        if let Some((id, _, _)) = self.objects.get(&key) {
            let id = *id;
            self.stats.back_references += 1;
            log::trace!("[encoder] back-reference to object {}", id);
            return self.out.write_u32(id);
        }

        let id = u32::try_from(self.objects.len() + 1)
            .map_err(|_| Error::LimitExceeded("object id space exhausted".into()))?;
        let guard = obj.read();
        let entity = guard.entity();
        self.objects.insert(key, (id, obj.clone(), entity.clone()));
        self.out.write_u32(id)?;
        log::trace!("[encoder] object {} ({})", id, entity.qualified_name());

        self.enter(EncoderState::WritingEntity)?;
        let result = self.entity(&entity).and_then(|()| {
            self.state = EncoderState::WritingValue;
            guard.encode(self)
        });
        self.leave();
        result?;

        self.stats.objects += 1;
        Ok(())
    }

    /// Typed convenience over [`Encoder::object`].
    pub fn shared<T: BinaryObject>(&mut self, obj: Option<&Shared<T>>) -> Result<()> {
        let obj = obj.map(|s| ObjectRef::from_shared(s.clone()));
        self.object(obj.as_ref())
    }

    /// Write an inline struct value: no id, no entity record.
    pub fn value(&mut self, obj: &dyn BinaryObject) -> Result<()> {
        self.guarded(|e| {
            e.enter(EncoderState::WritingValue)?;
            let result = obj.encode(e);
            e.leave();
            result
        })
    }

    /// Write an entity record, inlining the schema on first use.
    pub fn entity(&mut self, entity: &Arc<Entity>) -> Result<()> {
        self.guarded(|e| e.write_entity(entity))
    }

    fn write_entity(&mut self, entity: &Arc<Entity>) -> Result<()> {
        if !entity.is_complete() {
            return Err(Error::Schema(format!(
                "{} has no field layout",
                entity.qualified_name()
            )));
        }
        let signature = entity.signature();
        if !self.config.inline_schemas || self.schemas.contains(signature) {
            self.out.write_u8(ENTITY_REFERENCE)?;
            return self.out.write_string(signature);
        }

        // Marked before the fields so a self-referencing schema writes a
        // reference to itself.
        self.schemas.insert(signature.to_string());
        self.stats.schemas += 1;
        log::debug!("[encoder] inlining schema {}", signature);

        self.out.write_u8(ENTITY_INLINE)?;
        self.out.write_string(entity.package())?;
        self.out.write_string(entity.name())?;
        self.out.write_string(entity.version())?;
        self.out.write_string(signature)?;
        self.out.write_count(entity.fields().len())?;
        for field in entity.fields() {
            self.out.write_string(&field.name)?;
            self.write_type(&field.ty)?;
        }
        Ok(())
    }

    /// Write a type descriptor.
    pub fn write_type(&mut self, ty: &Type) -> Result<()> {
        self.guarded(|e| e.write_type_inner(ty))
    }

    fn write_type_inner(&mut self, ty: &Type) -> Result<()> {
        match ty {
            Type::Primitive(kind) => {
                self.out.write_u8(TYPE_PRIMITIVE)?;
                self.out.write_u8(kind.code())
            }
            Type::Pointer(to) => {
                self.out.write_u8(TYPE_POINTER)?;
                self.write_type(to)
            }
            Type::Struct(entity) => {
                self.out.write_u8(TYPE_STRUCT)?;
                self.entity(entity)
            }
            Type::List(element) => {
                self.out.write_u8(TYPE_LIST)?;
                self.write_type(element)
            }
            Type::Array(element, length) => {
                self.out.write_u8(TYPE_ARRAY)?;
                self.out.write_count(*length)?;
                self.write_type(element)
            }
            Type::Map(key, value) => {
                self.out.write_u8(TYPE_MAP)?;
                self.write_type(key)?;
                self.write_type(value)
            }
            Type::Enum(e) => {
                self.out.write_u8(TYPE_ENUM)?;
                self.out.write_u8(e.underlying.code())?;
                self.out.write_string(&e.name)?;
                self.out.write_count(e.variants.len())?;
                for variant in &e.variants {
                    self.out.write_string(&variant.name)?;
                    self.out.write_i64(variant.value)?;
                }
                Ok(())
            }
        }
    }

    /// Write one value according to its declared type.
    pub fn write_value(&mut self, ty: &Type, value: &Value) -> Result<()> {
        self.guarded(|e| e.write_value_inner(ty, value))
    }

    fn write_value_inner(&mut self, ty: &Type, value: &Value) -> Result<()> {
        match (ty, value) {
            (Type::Primitive(kind), v) => self.write_primitive(*kind, v),
            (Type::Pointer(to), Value::Object(obj)) => {
                if let (Type::Struct(target), Some(obj)) = (to.as_ref(), obj) {
                    let found = self.entity_of(obj);
                    if found.signature() != target.signature() {
                        return Err(Error::mismatch(
                            target.qualified_name(),
                            found.qualified_name(),
                        ));
                    }
                }
                self.object(obj.as_ref())
            }
            (Type::Struct(entity), Value::Struct(obj)) => {
                if obj.entity().signature() != entity.signature() {
                    return Err(Error::mismatch(
                        entity.qualified_name(),
                        obj.entity().qualified_name(),
                    ));
                }
                self.value(obj)
            }
            (Type::List(element), Value::List(items)) => {
                self.out.write_count(items.len())?;
                for item in items {
                    self.write_value(element, item)?;
                }
                Ok(())
            }
            (Type::Array(element, length), Value::Array(items)) => {
                if items.len() != *length {
                    return Err(Error::mismatch(
                        format!("{} elements", length),
                        format!("{} elements", items.len()),
                    ));
                }
                for item in items {
                    self.write_value(element, item)?;
                }
                Ok(())
            }
            (Type::Map(key_type, value_type), Value::Map(pairs)) => {
                self.out.write_count(pairs.len())?;
                for (k, v) in pairs {
                    self.write_value(key_type, k)?;
                    self.write_value(value_type, v)?;
                }
                Ok(())
            }
            (Type::Enum(e), Value::Enum(v)) => self.write_enum(e.underlying, *v),
            (ty, value) => Err(Error::mismatch(ty.to_string(), value.kind_name())),
        }
    }

    fn write_primitive(&mut self, kind: PrimitiveKind, value: &Value) -> Result<()> {
        match (kind, value) {
            (PrimitiveKind::Bool, Value::Bool(v)) => self.out.write_bool(*v),
            (PrimitiveKind::I8, Value::I8(v)) => self.out.write_i8(*v),
            (PrimitiveKind::I16, Value::I16(v)) => self.out.write_i16(*v),
            (PrimitiveKind::I32, Value::I32(v)) => self.out.write_i32(*v),
            (PrimitiveKind::I64, Value::I64(v)) => self.out.write_i64(*v),
            (PrimitiveKind::U8, Value::U8(v)) => self.out.write_u8(*v),
            (PrimitiveKind::U16, Value::U16(v)) => self.out.write_u16(*v),
            (PrimitiveKind::U32, Value::U32(v)) => self.out.write_u32(*v),
            (PrimitiveKind::U64, Value::U64(v)) => self.out.write_u64(*v),
            (PrimitiveKind::F32, Value::F32(v)) => self.out.write_f32(*v),
            (PrimitiveKind::F64, Value::F64(v)) => self.out.write_f64(*v),
            (PrimitiveKind::String, Value::String(v)) => self.out.write_string(v),
            _ => Err(Error::mismatch(kind.name(), value.kind_name())),
        }
    }

    // Enum values are carried as i64; the wire width is the underlying kind.
    fn write_enum(&mut self, underlying: PrimitiveKind, v: i64) -> Result<()> {
        let out_of_range = || Error::mismatch(underlying.name(), format!("enum value {}", v));
        match underlying {
            PrimitiveKind::I8 => self.out.write_i8(i8::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::I16 => self.out.write_i16(i16::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::I32 => self.out.write_i32(i32::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::I64 => self.out.write_i64(v),
            PrimitiveKind::U8 => self.out.write_u8(u8::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::U16 => self.out.write_u16(u16::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::U32 => self.out.write_u32(u32::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::U64 => self.out.write_u64(v as u64),
            other => Err(Error::Schema(format!(
                "enum cannot be represented as {}",
                other.name()
            ))),
        }
    }

    // Primitive passthroughs for hand-written and generated encode bodies.

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.out.write_bool(v)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.out.write_i8(v)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.out.write_i16(v)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.out.write_i32(v)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.out.write_i64(v)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.out.write_u8(v)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.out.write_u16(v)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.out.write_u32(v)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.out.write_u64(v)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.out.write_f32(v)
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.out.write_f64(v)
    }

    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.out.write_string(v)
    }

    pub fn write_count(&mut self, count: usize) -> Result<()> {
        self.out.write_count(count)
    }

    // Objects already in the table may be read-locked further up this call
    // stack, so their entity comes from the table.
    fn entity_of(&self, obj: &ObjectRef) -> Arc<Entity> {
        match self.objects.get(&obj.identity()) {
            Some((_, _, entity)) => entity.clone(),
            None => obj.entity(),
        }
    }

    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.poisoned {
            return Err(Error::Malformed(
                "encoder already failed on this stream".into(),
            ));
        }
        let result = f(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn enter(&mut self, state: EncoderState) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::LimitExceeded(format!(
                "nesting depth {} exceeded",
                self.config.max_depth
            )));
        }
        self.depth += 1;
        self.state = state;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
        if self.depth == 0 {
            self.state = EncoderState::Idle;
        }
    }
}

/// Encode a single root object into a fresh buffer.
pub fn to_bytes(obj: &ObjectRef) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Encoder::new(&mut buf).object(Some(obj))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicObject;
    use crate::object::shared;
    use crate::object::BinaryType;
    use crate::path::{AtomPath, MemoryRangePath, TypedMemoryPath};
    use crate::schema::{EnumType, EnumVariant, Field};

    #[test]
    fn test_null_is_sentinel() {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.object(None).unwrap();
        assert_eq!(e.stats().nulls, 1);
        drop(e);
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_ids_start_at_one_and_dedup() {
        let atom = shared(AtomPath::new(5));
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.shared(Some(&atom)).unwrap();
        e.shared(Some(&atom)).unwrap();
        let stats = e.stats();
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.back_references, 1);
        assert_eq!(stats.schemas, 1);
        assert_eq!(e.state(), EncoderState::Idle);
        drop(e);

        assert_eq!(&buf[..4], &[1, 0, 0, 0]);
        assert_eq!(buf[4], ENTITY_INLINE);
        // Second write is only the 4-byte back-reference.
        assert_eq!(&buf[buf.len() - 4..], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_schema_reference_after_first_use() {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.shared(Some(&shared(AtomPath::new(1)))).unwrap();
        let first_len = e.stats().bytes_written;
        e.shared(Some(&shared(AtomPath::new(2)))).unwrap();
        let stats = e.stats();
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.schemas, 1);
        drop(e);

        let second = &buf[first_len as usize..];
        assert_eq!(&second[..4], &[2, 0, 0, 0]);
        assert_eq!(second[4], ENTITY_REFERENCE);
    }

    #[test]
    fn test_no_inline_writes_references_only() {
        let mut buf = Vec::new();
        let config = EncoderConfig::new().with_inline_schemas(false);
        let mut e = Encoder::with_config(&mut buf, config);
        e.shared(Some(&shared(MemoryRangePath::default()))).unwrap();
        assert_eq!(e.stats().schemas, 0);
        drop(e);
        assert_eq!(buf[4], ENTITY_REFERENCE);
    }

    #[test]
    fn test_incomplete_entity_rejected() {
        let shell = Entity::new("test", "Shell", "", "shell");
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        assert!(matches!(e.entity(&shell), Err(Error::Schema(_))));
    }

    #[test]
    fn test_value_type_mismatch() {
        let entity = Entity::with_fields(
            "test",
            "Typed",
            "",
            "",
            vec![Field::new("Count", Type::Primitive(PrimitiveKind::U32))],
        )
        .unwrap();
        let mut obj = DynamicObject::blank(entity);
        obj.set("Count", "three").unwrap();

        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        let err = e.object(Some(&ObjectRef::new(obj))).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_poisoned_after_error() {
        let entity = Entity::with_fields(
            "test",
            "Counter",
            "",
            "",
            vec![Field::new("N", Type::Primitive(PrimitiveKind::U32))],
        )
        .unwrap();
        let mut obj = DynamicObject::blank(entity);
        obj.set("N", "one").unwrap();
        let obj = ObjectRef::new(obj);

        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        assert!(e.object(Some(&obj)).is_err());
        assert!(e.is_poisoned());
        // The id is already in the table; a back-reference here would point
        // at an unfinished record.
        let written = e.stats().bytes_written;
        assert!(matches!(e.object(Some(&obj)), Err(Error::Malformed(_))));
        assert!(matches!(e.object(None), Err(Error::Malformed(_))));
        assert_eq!(e.stats().bytes_written, written);
    }

    #[test]
    fn test_struct_field_wrong_entity() {
        let other = Entity::with_fields(
            "test",
            "Other",
            "",
            "",
            vec![Field::new("X", Type::Primitive(PrimitiveKind::U8))],
        )
        .unwrap();
        let mut path = DynamicObject::blank(TypedMemoryPath::class_entity());
        path.set("Type", Value::Struct(DynamicObject::blank(other)))
            .unwrap();

        let mut buf = Vec::new();
        let err = Encoder::new(&mut buf)
            .object(Some(&ObjectRef::new(path)))
            .unwrap_err();
        match err {
            Error::TypeMismatch { expected, found } => {
                assert_eq!(expected, "memory.Type");
                assert_eq!(found, "test.Other");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_target_wrong_entity() {
        let mut path = DynamicObject::blank(TypedMemoryPath::class_entity());
        path.set("Range", ObjectRef::new(AtomPath::new(3))).unwrap();

        let mut buf = Vec::new();
        let err = Encoder::new(&mut buf)
            .object(Some(&ObjectRef::new(path)))
            .unwrap_err();
        match err {
            Error::TypeMismatch { expected, found } => {
                assert_eq!(expected, "path.MemoryRange");
                assert_eq!(found, "path.Atom");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_target_checked_on_back_reference() {
        // A self pointer whose declared target is another entity: the check
        // must not block on the read lock held for the object itself.
        let entity = Entity::new("test", "Loop", "", "test.Loop");
        entity
            .set_fields(vec![Field::new(
                "Next",
                Type::pointer_to(AtomPath::class_entity()),
            )])
            .unwrap();
        let node = shared(DynamicObject::blank(entity));
        let obj = ObjectRef::from_shared(node.clone());
        node.write().set("Next", obj.clone()).unwrap();

        let mut buf = Vec::new();
        let err = Encoder::new(&mut buf).object(Some(&obj)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_enum_width_follows_underlying() {
        let color = EnumType::new(
            "Color",
            PrimitiveKind::U16,
            vec![EnumVariant::new("Red", 0), EnumVariant::new("Blue", 513)],
        );
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .write_value(&Type::Enum(color.clone()), &Value::Enum(513))
            .unwrap();
        assert_eq!(buf, vec![0x01, 0x02]);

        let mut sink = Vec::new();
        assert!(matches!(
            Encoder::new(&mut sink).write_value(&Type::Enum(color), &Value::Enum(70_000)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_array_length_checked() {
        let ty = Type::array(Type::Primitive(PrimitiveKind::U8), 2);
        let mut sink = Vec::new();
        assert!(Encoder::new(&mut sink)
            .write_value(&ty, &Value::Array(vec![1u8.into()]))
            .is_err());

        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .write_value(&ty, &Value::Array(vec![1u8.into(), 2u8.into()]))
            .unwrap();
        assert_eq!(buf, vec![1, 2]);
    }

    #[test]
    fn test_depth_limit() {
        let mut buf = Vec::new();
        let mut e = Encoder::with_config(&mut buf, EncoderConfig::new().with_max_depth(0));
        let err = e.shared(Some(&shared(AtomPath::new(0)))).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}
