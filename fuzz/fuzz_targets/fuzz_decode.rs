// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use objwire::{to_bytes, Decoder, DecoderConfig, EntityRegistry};

fuzz_target!(|data: &[u8]| {
    // Dynamic decode: every schema comes from the input.
    let registry = EntityRegistry::new();
    let config = DecoderConfig::new()
        .with_max_depth(64)
        .with_max_collection_len(4096)
        .with_max_string_len(4096);
    let mut input = data;
    let mut decoder = Decoder::with_config(&mut input, &registry, config);

    while decoder.bytes_read() < data.len() as u64 {
        match decoder.object() {
            // Anything that decodes must encode again.
            Ok(Some(root)) => {
                to_bytes(&root).expect("decoded graph re-encodes");
            }
            Ok(None) => {}
            Err(_) => break,
        }
    }
});
