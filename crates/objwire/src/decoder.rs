// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object graph decoder, the mirror of [`Encoder`](crate::Encoder).
//!
//! ## Schema resolution
//!
//! Signatures resolve first against the schemas inlined earlier in this
//! stream, then against the [`EntityRegistry`]. An inline schema is built in
//! two phases: its shell is entered in the stream-local table before its
//! fields are read (so it may refer to itself), and it is published to the
//! registry only once complete. Other threads never observe a half-built
//! entity.
//!
//! ## Failure
//!
//! Any error aborts the current call and poisons the decoder: the stream
//! cannot be resynchronized, so later calls fail immediately.

use crate::config::{
    DecoderConfig, ENTITY_INLINE, ENTITY_REFERENCE, FIRST_ID, NULL_ID, TYPE_ARRAY, TYPE_ENUM,
    TYPE_LIST, TYPE_MAP, TYPE_POINTER, TYPE_PRIMITIVE, TYPE_STRUCT,
};
use crate::dynamic::DynamicObject;
use crate::error::{Error, Result};
use crate::object::{BinaryObject, ObjectRef, Shared};
use crate::registry::EntityRegistry;
use crate::schema::{EnumType, EnumVariant, Entity, Field, PrimitiveKind, Type};
use crate::value::Value;
use crate::wire::WireReader;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

// Initial capacity cap for count-prefixed collections; the count itself is
// untrusted until the elements have actually been read.
const PREALLOC_LIMIT: usize = 1024;

/// Stream decoder. One reference table per instance.
pub struct Decoder<'a> {
    input: WireReader<&'a mut dyn Read>,
    registry: &'a EntityRegistry,
    config: DecoderConfig,
    // Index is id - 1. The entity is kept so pointer targets can be checked
    // while the object is still write-locked by its own decode.
    objects: Vec<(ObjectRef, Arc<Entity>)>,
    entities: HashMap<String, Arc<Entity>>,
    depth: usize,
    poisoned: bool,
}

impl<'a> Decoder<'a> {
    /// Decoder resolving schemas through the global registry.
    pub fn new(input: &'a mut dyn Read) -> Self {
        Self::with_registry(input, EntityRegistry::global())
    }

    pub fn with_registry(input: &'a mut dyn Read, registry: &'a EntityRegistry) -> Self {
        Self::with_config(input, registry, DecoderConfig::default())
    }

    pub fn with_config(
        input: &'a mut dyn Read,
        registry: &'a EntityRegistry,
        config: DecoderConfig,
    ) -> Self {
        Self {
            input: WireReader::new(input),
            registry,
            config,
            objects: Vec::new(),
            entities: HashMap::new(),
            depth: 0,
            poisoned: false,
        }
    }

    /// Bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.input.bytes_read()
    }

    /// Number of distinct objects materialized in this stream.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Schemas seen in this stream, sorted by signature.
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        let mut out: Vec<Arc<Entity>> = self.entities.values().cloned().collect();
        out.sort_by(|a, b| a.signature().cmp(b.signature()));
        out
    }

    /// Read a nullable shared object.
    pub fn object(&mut self) -> Result<Option<ObjectRef>> {
        let entry = self.guarded(Self::read_object)?;
        Ok(entry.map(|(obj, _)| obj))
    }

    /// True once a call has failed on this stream.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn read_object(&mut self) -> Result<Option<(ObjectRef, Arc<Entity>)>> {
        let id = self.input.read_u32()?;
        if id == NULL_ID {
            return Ok(None);
        }

        let index = (id - FIRST_ID) as usize;
        if let Some((existing, entity)) = self.objects.get(index) {
            log::trace!("[decoder] back-reference to object {}", id);
            return Ok(Some((existing.clone(), entity.clone())));
        }
        if index != self.objects.len() {
            return Err(Error::Malformed(format!(
                "object id {} out of sequence (next is {})",
                id,
                self.objects.len() + 1
            )));
        }

        let entity = self.entity()?;
        let obj = match self.registry.class(entity.signature()) {
            Some(class) => class.create(),
            None => ObjectRef::new(DynamicObject::unfilled(entity.clone())),
        };
        log::trace!("[decoder] object {} ({})", id, entity.qualified_name());

        // Registered before the fields so cycles find it.
        self.objects.push((obj.clone(), entity.clone()));

        self.enter()?;
        let result = {
            let mut guard = obj.write();
            guard.decode(self)
        };
        self.leave();
        result?;

        Ok(Some((obj, entity)))
    }

    /// Read a nullable object of a concrete type.
    pub fn object_as<T: BinaryObject>(&mut self) -> Result<Option<Shared<T>>> {
        match self.object()? {
            None => Ok(None),
            Some(obj) => obj.downcast::<T>().map(Some).ok_or_else(|| {
                Error::mismatch(std::any::type_name::<T>(), obj.describe())
            }),
        }
    }

    /// Read an inline struct value into `obj`.
    pub fn value(&mut self, obj: &mut dyn BinaryObject) -> Result<()> {
        self.guarded(|d| {
            d.enter()?;
            let result = obj.decode(d);
            d.leave();
            result
        })
    }

    /// Read an entity record.
    pub fn entity(&mut self) -> Result<Arc<Entity>> {
        self.guarded(Self::read_entity)
    }

    fn read_entity(&mut self) -> Result<Arc<Entity>> {
        match self.input.read_u8()? {
            ENTITY_REFERENCE => {
                let signature = self.input.read_string(self.config.max_string_len)?;
                self.resolve(&signature)
            }
            ENTITY_INLINE => self.read_schema(),
            tag => Err(Error::Malformed(format!("invalid entity tag {:#04x}", tag))),
        }
    }

    fn resolve(&self, signature: &str) -> Result<Arc<Entity>> {
        if let Some(entity) = self.entities.get(signature) {
            return Ok(entity.clone());
        }
        self.registry
            .lookup(signature)
            .ok_or_else(|| Error::UnknownEntity(signature.to_string()))
    }

    fn read_schema(&mut self) -> Result<Arc<Entity>> {
        let max = self.config.max_string_len;
        let package = self.input.read_string(max)?;
        let name = self.input.read_string(max)?;
        let version = self.input.read_string(max)?;
        let signature = self.input.read_string(max)?;
        if signature.is_empty() {
            return Err(Error::Malformed(format!(
                "inline schema {}.{} has no signature",
                package, name
            )));
        }

        let shell = Entity::new(package, name, version, signature.clone());
        let duplicate = self.entities.contains_key(&signature);
        if !duplicate {
            self.entities.insert(signature.clone(), shell.clone());
        }

        self.enter()?;
        let fields = self.read_fields();
        self.leave();
        shell
            .set_fields(fields?)
            .map_err(|e| Error::Malformed(e.to_string()))?;

        if duplicate {
            // Repeated definition; the body was consumed, keep the first one.
            return self.resolve(&signature);
        }

        let entity = if self.config.publish_schemas {
            self.registry.register(shell)?
        } else {
            shell
        };
        log::debug!("[decoder] learned schema {}", signature);
        self.entities.insert(signature, entity.clone());
        Ok(entity)
    }

    fn read_fields(&mut self) -> Result<Vec<Field>> {
        let count = self.input.read_count(self.config.max_collection_len)?;
        let mut fields = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            let name = self.input.read_string(self.config.max_string_len)?;
            let ty = self.read_type()?;
            fields.push(Field::new(name, ty));
        }
        Ok(fields)
    }

    /// Read a type descriptor.
    pub fn read_type(&mut self) -> Result<Type> {
        self.guarded(|d| {
            d.enter()?;
            let result = d.read_type_inner();
            d.leave();
            result
        })
    }

    fn read_type_inner(&mut self) -> Result<Type> {
        match self.input.read_u8()? {
            TYPE_PRIMITIVE => Ok(Type::Primitive(self.read_primitive_kind()?)),
            TYPE_POINTER => Ok(Type::pointer(self.read_type()?)),
            TYPE_STRUCT => Ok(Type::Struct(self.entity()?)),
            TYPE_LIST => Ok(Type::list(self.read_type()?)),
            TYPE_ARRAY => {
                let length = self.input.read_count(self.config.max_collection_len)?;
                Ok(Type::array(self.read_type()?, length))
            }
            TYPE_MAP => {
                let key = self.read_type()?;
                let value = self.read_type()?;
                Ok(Type::map(key, value))
            }
            TYPE_ENUM => {
                let underlying = self.read_primitive_kind()?;
                if !underlying.is_integer() {
                    return Err(Error::Malformed(format!(
                        "enum over non-integer {}",
                        underlying.name()
                    )));
                }
                let name = self.input.read_string(self.config.max_string_len)?;
                let count = self.input.read_count(self.config.max_collection_len)?;
                let mut variants = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    let variant = self.input.read_string(self.config.max_string_len)?;
                    variants.push(EnumVariant::new(variant, self.input.read_i64()?));
                }
                Ok(Type::Enum(EnumType::new(name, underlying, variants)))
            }
            tag => Err(Error::Malformed(format!("invalid type tag {:#04x}", tag))),
        }
    }

    fn read_primitive_kind(&mut self) -> Result<PrimitiveKind> {
        let code = self.input.read_u8()?;
        PrimitiveKind::from_code(code)
            .ok_or_else(|| Error::Malformed(format!("invalid primitive kind {}", code)))
    }

    /// Read one value according to its declared type.
    pub fn read_value(&mut self, ty: &Type) -> Result<Value> {
        self.guarded(|d| d.read_value_inner(ty))
    }

    fn read_value_inner(&mut self, ty: &Type) -> Result<Value> {
        match ty {
            Type::Primitive(kind) => self.read_primitive(*kind),
            Type::Pointer(to) => {
                let entry = self.guarded(Self::read_object)?;
                if let (Type::Struct(target), Some((_, found))) = (to.as_ref(), &entry) {
                    if found.signature() != target.signature() {
                        return Err(Error::mismatch(
                            target.qualified_name(),
                            found.qualified_name(),
                        ));
                    }
                }
                Ok(Value::Object(entry.map(|(obj, _)| obj)))
            }
            Type::Struct(entity) => {
                let mut obj = DynamicObject::unfilled(entity.clone());
                self.value(&mut obj)?;
                Ok(Value::Struct(obj))
            }
            Type::List(element) => {
                let count = self.input.read_count(self.config.max_collection_len)?;
                let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    items.push(self.read_value(element)?);
                }
                Ok(Value::List(items))
            }
            Type::Array(element, length) => {
                let mut items = Vec::with_capacity((*length).min(PREALLOC_LIMIT));
                for _ in 0..*length {
                    items.push(self.read_value(element)?);
                }
                Ok(Value::Array(items))
            }
            Type::Map(key_type, value_type) => {
                let count = self.input.read_count(self.config.max_collection_len)?;
                let mut pairs = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    let k = self.read_value(key_type)?;
                    let v = self.read_value(value_type)?;
                    pairs.push((k, v));
                }
                Ok(Value::Map(pairs))
            }
            Type::Enum(e) => Ok(Value::Enum(self.read_enum(e.underlying)?)),
        }
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Value> {
        Ok(match kind {
            PrimitiveKind::Bool => Value::Bool(self.input.read_bool()?),
            PrimitiveKind::I8 => Value::I8(self.input.read_i8()?),
            PrimitiveKind::I16 => Value::I16(self.input.read_i16()?),
            PrimitiveKind::I32 => Value::I32(self.input.read_i32()?),
            PrimitiveKind::I64 => Value::I64(self.input.read_i64()?),
            PrimitiveKind::U8 => Value::U8(self.input.read_u8()?),
            PrimitiveKind::U16 => Value::U16(self.input.read_u16()?),
            PrimitiveKind::U32 => Value::U32(self.input.read_u32()?),
            PrimitiveKind::U64 => Value::U64(self.input.read_u64()?),
            PrimitiveKind::F32 => Value::F32(self.input.read_f32()?),
            PrimitiveKind::F64 => Value::F64(self.input.read_f64()?),
            PrimitiveKind::String => {
                Value::String(self.input.read_string(self.config.max_string_len)?)
            }
        })
    }

    fn read_enum(&mut self, underlying: PrimitiveKind) -> Result<i64> {
        Ok(match underlying {
            PrimitiveKind::I8 => i64::from(self.input.read_i8()?),
            PrimitiveKind::I16 => i64::from(self.input.read_i16()?),
            PrimitiveKind::I32 => i64::from(self.input.read_i32()?),
            PrimitiveKind::I64 => self.input.read_i64()?,
            PrimitiveKind::U8 => i64::from(self.input.read_u8()?),
            PrimitiveKind::U16 => i64::from(self.input.read_u16()?),
            PrimitiveKind::U32 => i64::from(self.input.read_u32()?),
            PrimitiveKind::U64 => self.input.read_u64()? as i64,
            other => {
                return Err(Error::Schema(format!(
                    "enum cannot be represented as {}",
                    other.name()
                )))
            }
        })
    }

    // Primitive passthroughs for hand-written and generated decode bodies.

    pub fn read_bool(&mut self) -> Result<bool> {
        self.input.read_bool()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.input.read_i8()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.input.read_i16()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.input.read_i32()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.input.read_i64()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.input.read_u8()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.input.read_u16()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.input.read_u32()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.input.read_u64()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.input.read_f32()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.input.read_f64()
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.input.read_string(self.config.max_string_len)
    }

    pub fn read_count(&mut self) -> Result<usize> {
        self.input.read_count(self.config.max_collection_len)
    }

    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.poisoned {
            return Err(Error::Malformed(
                "decoder already failed on this stream".into(),
            ));
        }
        let result = f(self);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(Error::LimitExceeded(format!(
                "nesting depth {} exceeded",
                self.config.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Decode a single root object through the global registry.
pub fn from_bytes(bytes: &[u8]) -> Result<Option<ObjectRef>> {
    from_bytes_with(bytes, EntityRegistry::global())
}

/// Decode a single root object through `registry`.
pub fn from_bytes_with(bytes: &[u8], registry: &EntityRegistry) -> Result<Option<ObjectRef>> {
    let mut input = bytes;
    Decoder::with_registry(&mut input, registry).object()
}
