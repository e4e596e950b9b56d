// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Shared fixtures for integration tests.

#![allow(dead_code)]

use objwire::{
    BinaryObject, BinaryType, Decoder, Encoder, Entity, EntityRegistry, Field, ObjectRef,
    PrimitiveKind, Result, Shared, Type,
};
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// Self-referential graph node: a pointer to another node and a list of
/// child pointers.
#[derive(Debug, Default)]
pub struct Node {
    pub label: String,
    pub next: Option<Shared<Node>>,
    pub children: Vec<Option<Shared<Node>>>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Drop outgoing edges so reference cycles can be reclaimed.
    pub fn unlink(&mut self) {
        self.next = None;
        self.children.clear();
    }
}

impl BinaryObject for Node {
    fn entity(&self) -> Arc<Entity> {
        Self::class_entity()
    }

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.write_string(&self.label)?;
        e.shared(self.next.as_ref())?;
        e.write_count(self.children.len())?;
        for child in &self.children {
            e.shared(child.as_ref())?;
        }
        Ok(())
    }

    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()> {
        self.label = d.read_string()?;
        self.next = d.object_as::<Node>()?;
        let count = d.read_count()?;
        self.children = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            self.children.push(d.object_as::<Node>()?);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BinaryType for Node {
    fn class_entity() -> Arc<Entity> {
        static ENTITY: OnceLock<Arc<Entity>> = OnceLock::new();
        ENTITY
            .get_or_init(|| {
                let node = Entity::new("graph", "Node", "1", "");
                node.set_fields(vec![
                    Field::new("Label", Type::Primitive(PrimitiveKind::String)),
                    Field::new("Next", Type::pointer_to(node.clone())),
                    Field::new("Children", Type::list(Type::pointer_to(node.clone()))),
                ])
                .expect("node schema");
                node
            })
            .clone()
    }
}

pub fn node_registry() -> EntityRegistry {
    let registry = EntityRegistry::new();
    registry.register_class(Node::class()).unwrap();
    registry
}

/// Encode several roots into one stream sharing a reference table.
pub fn encode_roots(roots: &[ObjectRef]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);
    for root in roots {
        e.object(Some(root)).unwrap();
    }
    buf
}

/// Decode `count` roots from one stream.
pub fn decode_roots(bytes: &[u8], registry: &EntityRegistry, count: usize) -> Vec<ObjectRef> {
    let mut input = bytes;
    let mut d = Decoder::with_registry(&mut input, registry);
    let roots = (0..count)
        .map(|_| d.object().unwrap().expect("non-null root"))
        .collect();
    assert_eq!(d.bytes_read(), bytes.len() as u64, "trailing bytes");
    roots
}
