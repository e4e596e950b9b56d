// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The runtime contract of serializable values and their shared handles.
//!
//! # Identity
//!
//! Deduplication in a stream is by instance, never by structural equality:
//! two equal-but-distinct objects stay two objects on the wire. The identity
//! of an object is the address of its `Arc` allocation, so every clone of an
//! [`ObjectRef`] (or of the [`Shared<T>`] it was built from) is the same
//! object.
//!
//! # Cycles
//!
//! Object graphs are reference counted. A cyclic graph keeps itself alive
//! until the caller clears one of the back edges.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::schema::Entity;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shared, mutable handle to a concrete object type.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value into a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// A value participating in the protocol.
///
/// `encode`/`decode` write and read the fields in the entity's declared
/// order; the surrounding id and entity record are handled by the
/// [`Encoder`]/[`Decoder`].
pub trait BinaryObject: Any + Send + Sync {
    /// Schema of this object. The same `Arc` for every instance of a type.
    fn entity(&self) -> Arc<Entity>;

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()>;

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Blank-constructor capability bound to one entity.
pub trait BinaryClass: Send + Sync {
    fn entity(&self) -> Arc<Entity>;

    /// Zero-valued instance, populated afterwards by the decoder.
    fn create(&self) -> ObjectRef;
}

/// A concrete type with a static schema.
pub trait BinaryType: BinaryObject + Default {
    /// The per-type entity (typically a `OnceLock` static).
    fn class_entity() -> Arc<Entity>;

    fn class() -> Arc<dyn BinaryClass>
    where
        Self: Sized,
    {
        Arc::new(TypedClass::<Self>::new())
    }
}

/// [`BinaryClass`] for any [`BinaryType`].
pub struct TypedClass<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedClass<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedClass<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BinaryType> BinaryClass for TypedClass<T> {
    fn entity(&self) -> Arc<Entity> {
        T::class_entity()
    }

    fn create(&self) -> ObjectRef {
        ObjectRef::new(T::default())
    }
}

/// Type-erased shared object handle.
///
/// Keeps a second, `Any`-typed view of the same allocation so decoded
/// references can be turned back into [`Shared<T>`].
#[derive(Clone)]
pub struct ObjectRef {
    cell: Arc<RwLock<dyn BinaryObject>>,
    any: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    pub fn new<T: BinaryObject>(value: T) -> Self {
        Self::from_shared(shared(value))
    }

    pub fn from_shared<T: BinaryObject>(shared: Shared<T>) -> Self {
        let any: Arc<dyn Any + Send + Sync> = shared.clone();
        Self { cell: shared, any }
    }

    /// Identity key for reference tables.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.identity() == other.identity()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, dyn BinaryObject> {
        self.cell.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, dyn BinaryObject> {
        self.cell.write()
    }

    pub fn entity(&self) -> Arc<Entity> {
        self.cell.read().entity()
    }

    /// Typed view of the same object, if it is a `T`.
    pub fn downcast<T: BinaryObject>(&self) -> Option<Shared<T>> {
        self.any.clone().downcast::<RwLock<T>>().ok()
    }

    /// Entity name without blocking; used in diagnostics while the object may
    /// still be locked by the decoder.
    pub fn describe(&self) -> String {
        match self.cell.try_read() {
            Some(guard) => guard.entity().qualified_name(),
            None => "<object in use>".to_string(),
        }
    }
}

impl<T: BinaryObject> From<Shared<T>> for ObjectRef {
    fn from(shared: Shared<T>) -> Self {
        Self::from_shared(shared)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.describe(), self.identity())
    }
}
