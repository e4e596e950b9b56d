// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use objwire::path::register_types;
use objwire::{Decoder, DecoderConfig, EntityRegistry};
use std::sync::OnceLock;

static REGISTRY: OnceLock<EntityRegistry> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    // Concrete path classes registered: exercises the typed decode bodies.
    let registry = REGISTRY.get_or_init(|| {
        let registry = EntityRegistry::new();
        let _ = register_types(&registry);
        registry
    });
    // The registry outlives each run; keep inputs from growing it.
    let config = DecoderConfig::new()
        .with_max_depth(64)
        .with_publish_schemas(false);
    let mut input = data;
    let _ = Decoder::with_config(&mut input, registry, config).object();
});
