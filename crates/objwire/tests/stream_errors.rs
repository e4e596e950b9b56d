// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Damaged streams: truncation, bad tags, bad ids, limits and random
// corruption must fail cleanly (an Err, never a panic or a hang).

mod common;

use common::{encode_roots, node_registry, Node};
use objwire::path::{register_types, AtomPath, MemoryRangePath, MemoryType, TypedMemoryPath};
use objwire::{
    from_bytes_with, shared, to_bytes, Decoder, DecoderConfig, EntityRegistry, Error, ObjectRef,
};

fn sample_bytes() -> Vec<u8> {
    let range = MemoryRangePath::new(Some(shared(AtomPath::new(5))), 0, 0x100, 32);
    let path = TypedMemoryPath::new(Some(shared(range)), MemoryType::integer(2, true));
    to_bytes(&ObjectRef::new(path)).unwrap()
}

#[test]
fn every_truncation_is_unexpected_eof() {
    let bytes = sample_bytes();
    let registry = EntityRegistry::new();
    register_types(&registry).unwrap();
    for cut in 0..bytes.len() {
        match from_bytes_with(&bytes[..cut], &registry) {
            Err(Error::UnexpectedEof) => {}
            other => panic!("cut at {}: expected UnexpectedEof, got {:?}", cut, other),
        }
    }
    assert!(from_bytes_with(&bytes, &registry).unwrap().is_some());
}

#[test]
fn invalid_type_tag() {
    let mut bytes = sample_bytes();
    // id(4) entity-tag(1) then four strings; the first field's type tag
    // follows the field count and the field name "Range".
    let name = b"Range";
    let at = bytes
        .windows(name.len())
        .position(|w| w == name)
        .expect("field name present")
        + name.len();
    bytes[at] = 0x42;
    let err = from_bytes_with(&bytes, &EntityRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)), "{:?}", err);
}

#[test]
fn skipped_id_is_malformed() {
    let mut bytes = sample_bytes();
    bytes[0] = 2;
    let err = from_bytes_with(&bytes, &EntityRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
}

#[test]
fn invalid_utf8_is_malformed() {
    let mut bytes = sample_bytes();
    // First string after the entity tag is the package name "path".
    assert_eq!(&bytes[9..13], b"path");
    bytes[9] = 0xff;
    let err = from_bytes_with(&bytes, &EntityRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
}

#[test]
fn string_limit() {
    let bytes = sample_bytes();
    let registry = EntityRegistry::new();
    let mut input = &bytes[..];
    let config = DecoderConfig::new().with_max_string_len(3);
    let err = Decoder::with_config(&mut input, &registry, config)
        .object()
        .unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));
}

#[test]
fn depth_limit() {
    // A linked chain deeper than the configured limit.
    let head = shared(Node::new("0"));
    let mut tail = head.clone();
    for i in 1..40 {
        let next = shared(Node::new(i.to_string()));
        tail.write().next = Some(next.clone());
        tail = next;
    }
    let bytes = encode_roots(&[ObjectRef::from_shared(head.clone())]);

    let registry = node_registry();
    let mut input = &bytes[..];
    let config = DecoderConfig::new().with_max_depth(16);
    let err = Decoder::with_config(&mut input, &registry, config)
        .object()
        .unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));

    let mut input = &bytes[..];
    assert!(Decoder::with_registry(&mut input, &registry)
        .object()
        .unwrap()
        .is_some());
}

#[test]
fn random_corruption_never_panics() {
    let original = sample_bytes();
    let config = DecoderConfig::new()
        .with_max_collection_len(256)
        .with_max_string_len(256)
        .with_max_depth(32);
    let mut rng = fastrand::Rng::with_seed(7);

    for _ in 0..2000 {
        let mut bytes = original.clone();
        for _ in 0..rng.usize(1..4) {
            let at = rng.usize(0..bytes.len());
            bytes[at] = rng.u8(..);
        }
        let registry = EntityRegistry::new();
        if rng.bool() {
            register_types(&registry).unwrap();
        }
        let mut input = &bytes[..];
        let mut d = Decoder::with_config(&mut input, &registry, config.clone());
        // Either outcome is acceptable; reaching here without a panic is the
        // property under test.
        let _ = d.object();
    }
}
