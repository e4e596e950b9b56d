// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # objwire - Self-describing binary object graphs
//!
//! Encodes live object graphs (shared references, cycles, nested structs) to
//! a compact little-endian byte stream and decodes them back, preserving the
//! sharing topology. Schemas travel with the stream the first time they are
//! used, so a reader with no compile-time knowledge of a type can still
//! decode and inspect it.
//!
//! ## Quick Start
//!
//! ```rust
//! use objwire::path::{register_types, AtomPath, MemoryRangePath, MemoryType, TypedMemoryPath};
//! use objwire::{from_bytes_with, shared, to_bytes, EntityRegistry, ObjectRef};
//!
//! fn main() -> objwire::Result<()> {
//!     let registry = EntityRegistry::new();
//!     register_types(&registry)?;
//!
//!     let atom = shared(AtomPath::new(7));
//!     let range = shared(MemoryRangePath::new(Some(atom), 0, 0x4000, 16));
//!     let path = TypedMemoryPath::new(Some(range), MemoryType::integer(4, true));
//!
//!     let bytes = to_bytes(&ObjectRef::new(path.clone()))?;
//!     let decoded = from_bytes_with(&bytes, &registry)?.expect("non-null root");
//!     let decoded = decoded.downcast::<TypedMemoryPath>().expect("concrete type");
//!     assert_eq!(*decoded.read(), path);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   BinaryObject types (path::*, DynamicObject, user types)           |
//! +---------------------------------------------------------------------+
//! |   Encoder / Decoder    per-stream reference table + schema table    |
//! +---------------------------------------------------------------------+
//! |   Type System          Entity, Field, Type, Value                   |
//! +---------------------------------------------------------------------+
//! |   Wire primitives      little-endian cursor over Read / Write       |
//! +---------------------------------------------------------------------+
//!           EntityRegistry (process-wide, signature -> schema/class)
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Encoder`] | Writes objects, deduplicating by instance identity |
//! | [`Decoder`] | Reads objects, resolving back-references |
//! | [`Entity`] | Schema: package, name, version, signature, fields |
//! | [`EntityRegistry`] | Signature-keyed schemas and classes |
//! | [`ObjectRef`] | Type-erased shared object handle |
//! | [`DynamicObject`] | Schema-driven object used when no class is registered |

pub mod config;
pub mod decoder;
pub mod dynamic;
pub mod encoder;
pub mod error;
pub mod object;
pub mod path;
pub mod registry;
pub mod schema;
pub mod value;
pub mod wire;

pub use config::{DecoderConfig, EncoderConfig};
pub use decoder::{from_bytes, from_bytes_with, Decoder};
pub use dynamic::{DynamicClass, DynamicObject};
pub use encoder::{to_bytes, Encoder, EncoderState, EncoderStats};
pub use error::{Error, Result};
pub use object::{shared, BinaryClass, BinaryObject, BinaryType, ObjectRef, Shared, TypedClass};
pub use registry::EntityRegistry;
pub use schema::{EnumType, EnumVariant, Entity, Field, PrimitiveKind, Type};
pub use value::Value;
