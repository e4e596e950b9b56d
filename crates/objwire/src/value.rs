// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic field values.

use crate::dynamic::DynamicObject;
use crate::object::ObjectRef;

/// A value of any schema-describable type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Primitives
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),

    // References
    Object(Option<ObjectRef>),

    // Composites
    Struct(DynamicObject),
    List(Vec<Value>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>), // stream order
    Enum(i64),
}

impl Value {
    /// Short kind name used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "int8",
            Self::I16(_) => "int16",
            Self::I32(_) => "int32",
            Self::I64(_) => "int64",
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::F32(_) => "float32",
            Self::F64(_) => "float64",
            Self::String(_) => "string",
            Self::Object(_) => "pointer",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Enum(_) => "enum",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Pointer target. `None` both for null pointers and non-pointer values.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(v) => v.as_ref(),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&DynamicObject> {
        match self {
            Self::Struct(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) | Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn enum_value(&self) -> Option<i64> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// True for a null pointer.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Object(None))
    }
}

// Conversion traits
macro_rules! impl_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Self::$variant(v)
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i8, I8);
impl_from!(i16, I16);
impl_from!(i32, I32);
impl_from!(i64, I64);
impl_from!(u8, U8);
impl_from!(u16, U16);
impl_from!(u32, U32);
impl_from!(u64, U64);
impl_from!(f32, F32);
impl_from!(f64, F64);
impl_from!(String, String);
impl_from!(DynamicObject, Struct);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(Some(v))
    }
}

impl From<Option<ObjectRef>> for Value {
    fn from(v: Option<ObjectRef>) -> Self {
        Self::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_values() {
        let v = Value::from(42u32);
        assert_eq!(v.as_u32(), Some(42));
        assert_eq!(v.as_i32(), None);
        assert_eq!(v.kind_name(), "uint32");

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_null_pointer() {
        let v = Value::Object(None);
        assert!(v.is_null());
        assert!(v.as_object().is_none());
        assert!(!Value::U8(0).is_null());
    }

    #[test]
    fn test_collections() {
        let v = Value::List(vec![1u8.into(), 2u8.into()]);
        assert_eq!(v.as_list().map(<[Value]>::len), Some(2));

        let m = Value::Map(vec![("a".into(), 1u32.into())]);
        assert_eq!(m.as_map().map(|p| p[0].1.as_u32()), Some(Some(1)));
    }
}
