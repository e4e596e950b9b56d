// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity Registry
//!
//! Process-wide table of schemas keyed by signature, plus the concrete
//! classes bound to them.
//!
//! # Architecture
//!
//! ```text
//! EntityRegistry (static global, or one per isolated peer)
//! +-- entities: DashMap<signature, Arc<Entity>>
//! +-- names:    DashMap<"package.name", Arc<Entity>>   (first registered wins)
//! +-- classes:  DashMap<signature, Arc<dyn BinaryClass>>
//! ```
//!
//! # Thread Safety
//!
//! Registration is rare and idempotent; lookups are the hot path and never
//! block each other (sharded maps).

use crate::error::{Error, Result};
use crate::object::BinaryClass;
use crate::schema::Entity;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<EntityRegistry> = OnceLock::new();

/// Signature-keyed schema and class table.
#[derive(Default)]
pub struct EntityRegistry {
    entities: DashMap<String, Arc<Entity>>,
    names: DashMap<String, Arc<Entity>>,
    classes: DashMap<String, Arc<dyn BinaryClass>>,
}

impl EntityRegistry {
    /// Create an empty, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static EntityRegistry {
        GLOBAL.get_or_init(EntityRegistry::new)
    }

    /// Register a completed entity.
    ///
    /// Idempotent: if the signature is already known, the previously
    /// registered entity is returned and `entity` is dropped.
    pub fn register(&self, entity: Arc<Entity>) -> Result<Arc<Entity>> {
        if !entity.is_complete() {
            return Err(Error::Schema(format!(
                "cannot register {} before its fields are set",
                entity.qualified_name()
            )));
        }
        let signature = entity.signature().to_string();
        match self.entities.entry(signature) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                log::debug!(
                    "[registry] registered {} ({})",
                    entity.qualified_name(),
                    entity.signature()
                );
                slot.insert(entity.clone());
                self.names
                    .entry(entity.qualified_name())
                    .or_insert_with(|| entity.clone());
                Ok(entity)
            }
        }
    }

    /// Register a class and its entity. Idempotent per signature.
    pub fn register_class(&self, class: Arc<dyn BinaryClass>) -> Result<Arc<Entity>> {
        let entity = self.register(class.entity())?;
        self.classes
            .entry(entity.signature().to_string())
            .or_insert(class);
        Ok(entity)
    }

    pub fn lookup(&self, signature: &str) -> Option<Arc<Entity>> {
        self.entities.get(signature).map(|e| e.value().clone())
    }

    pub fn lookup_name(&self, package: &str, name: &str) -> Option<Arc<Entity>> {
        self.names
            .get(&format!("{}.{}", package, name))
            .map(|e| e.value().clone())
    }

    /// Concrete class bound to a signature, if any.
    pub fn class(&self, signature: &str) -> Option<Arc<dyn BinaryClass>> {
        self.classes.get(signature).map(|c| c.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All registered signatures (sorted for determinism).
    pub fn signatures(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entities.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }
}
