// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven objects.
//!
//! A [`DynamicObject`] holds one [`Value`] per field of its entity. The decoder
//! falls back to it whenever a stream uses an entity for which no concrete
//! class is registered, so any self-describing stream can be decoded and
//! inspected without compile-time type knowledge.
//!
//! # Example
//!
//! ```rust
//! use objwire::{DynamicObject, Entity, Field, PrimitiveKind, Type};
//!
//! let entity = Entity::with_fields(
//!     "sensor",
//!     "Reading",
//!     "",
//!     "",
//!     vec![
//!         Field::new("Id", Type::Primitive(PrimitiveKind::U32)),
//!         Field::new("Celsius", Type::Primitive(PrimitiveKind::F64)),
//!     ],
//! )
//! .unwrap();
//!
//! let mut reading = DynamicObject::blank(entity);
//! reading.set("Id", 42u32).unwrap();
//! reading.set("Celsius", 23.5f64).unwrap();
//! assert_eq!(reading.get("Celsius").and_then(|v| v.as_f64()), Some(23.5));
//! ```

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::object::{BinaryClass, BinaryObject, ObjectRef};
use crate::schema::Entity;
use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Object whose layout comes entirely from its entity.
#[derive(Clone, PartialEq)]
pub struct DynamicObject {
    entity: Arc<Entity>,
    values: Vec<Value>,
}

impl DynamicObject {
    /// Zero-valued instance.
    pub fn blank(entity: Arc<Entity>) -> Self {
        let values = entity.fields().iter().map(|f| f.ty.zero_value()).collect();
        Self { entity, values }
    }

    /// Instance with no values yet; only valid as a decode target.
    pub(crate) fn unfilled(entity: Arc<Entity>) -> Self {
        Self {
            entity,
            values: Vec::new(),
        }
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Field name / value pairs in wire order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entity
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(self.entity.field_index(name)?)
    }

    /// Set a field. The value type is checked when encoding.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.entity.field_index(name).ok_or_else(|| {
            Error::Schema(format!(
                "{} has no field {}",
                self.entity.qualified_name(),
                name
            ))
        })?;
        self.values[index] = value.into();
        Ok(())
    }
}

impl BinaryObject for DynamicObject {
    fn entity(&self) -> Arc<Entity> {
        self.entity.clone()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        let fields = self.entity.fields();
        if fields.len() != self.values.len() {
            return Err(Error::mismatch(
                format!("{} fields", fields.len()),
                format!("{} values", self.values.len()),
            ));
        }
        for (field, value) in fields.iter().zip(&self.values) {
            e.write_value(&field.ty, value)?;
        }
        Ok(())
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        let entity = self.entity.clone();
        let mut values = Vec::with_capacity(entity.fields().len());
        for field in entity.fields() {
            values.push(d.read_value(&field.ty)?);
        }
        self.values = values;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.entity.name());
        for (name, value) in self.fields() {
            s.field(name, value);
        }
        s.finish()
    }
}

/// Class creating [`DynamicObject`]s for one entity.
pub struct DynamicClass {
    entity: Arc<Entity>,
}

impl DynamicClass {
    pub fn new(entity: Arc<Entity>) -> Self {
        Self { entity }
    }
}

impl BinaryClass for DynamicClass {
    fn entity(&self) -> Arc<Entity> {
        self.entity.clone()
    }

    fn create(&self) -> ObjectRef {
        ObjectRef::new(DynamicObject::blank(self.entity.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, PrimitiveKind, Type};

    fn reading() -> Arc<Entity> {
        Entity::with_fields(
            "sensor",
            "Reading",
            "",
            "",
            vec![
                Field::new("Id", Type::Primitive(PrimitiveKind::U32)),
                Field::new("Tags", Type::list(Type::Primitive(PrimitiveKind::String))),
                Field::new("Source", Type::pointer(Type::Primitive(PrimitiveKind::U8))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_blank_has_zero_values() {
        let obj = DynamicObject::blank(reading());
        assert_eq!(obj.get("Id"), Some(&Value::U32(0)));
        assert_eq!(obj.get("Tags"), Some(&Value::List(vec![])));
        assert!(obj.get("Source").map(Value::is_null).unwrap_or(false));
        assert!(obj.get("Missing").is_none());
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut obj = DynamicObject::blank(reading());
        assert!(obj.set("Id", 7u32).is_ok());
        assert!(matches!(obj.set("Nope", 1u32), Err(Error::Schema(_))));
        assert_eq!(obj.get("Id").and_then(Value::as_u32), Some(7));
    }

    #[test]
    fn test_fields_in_wire_order() {
        let obj = DynamicObject::blank(reading());
        let names: Vec<&str> = obj.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Id", "Tags", "Source"]);
    }

    #[test]
    fn test_dynamic_class_creates_blank() {
        let class = DynamicClass::new(reading());
        let obj = class.create();
        let dynamic = obj.downcast::<DynamicObject>().unwrap();
        assert_eq!(dynamic.read().values().len(), 3);
    }
}
