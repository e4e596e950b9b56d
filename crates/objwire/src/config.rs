// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire constants and per-stream configuration.
//!
//! All tag values live here. **Never hardcode them elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: wire constants (null id, entity tags, type tags)
//! - **Level 2 (Dynamic)**: [`EncoderConfig`] / [`DecoderConfig`], one per stream

// =======================================================================
// Reference ids
// =======================================================================

/// Reserved id for an absent object.
pub const NULL_ID: u32 = 0;

/// First id assigned to an object in a stream. Ids grow by one from here.
pub const FIRST_ID: u32 = 1;

// =======================================================================
// Entity records
// =======================================================================

/// Entity record: signature reference to a schema known to the peer.
pub const ENTITY_REFERENCE: u8 = 0x00;

/// Entity record: full schema inlined in the stream.
pub const ENTITY_INLINE: u8 = 0x01;

// =======================================================================
// Type descriptor tags
// =======================================================================

pub const TYPE_PRIMITIVE: u8 = 0x01;
pub const TYPE_POINTER: u8 = 0x02;
pub const TYPE_STRUCT: u8 = 0x03;
pub const TYPE_LIST: u8 = 0x04;
pub const TYPE_ARRAY: u8 = 0x05;
pub const TYPE_MAP: u8 = 0x06;
pub const TYPE_ENUM: u8 = 0x07;

// =======================================================================
// Default limits
// =======================================================================

/// Maximum nesting of objects, inline structs and type descriptors.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Maximum element count accepted for a list, map, array or field table.
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 1 << 24;

/// Maximum byte length accepted for a string.
pub const DEFAULT_MAX_STRING_LEN: usize = 1 << 24;

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Inline each schema the first time it is used in the stream.
    ///
    /// When disabled, only signature references are written and the peer must
    /// already have every schema registered.
    pub inline_schemas: bool,
    /// Maximum object/struct nesting before the encoder gives up.
    pub max_depth: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            inline_schemas: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inline_schemas(mut self, inline: bool) -> Self {
        self.inline_schemas = inline;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum object/struct/type nesting.
    pub max_depth: usize,
    /// Maximum element count of any count-prefixed collection.
    pub max_collection_len: usize,
    /// Maximum byte length of any string.
    pub max_string_len: usize,
    /// Publish completed inline schemas to the registry.
    pub publish_schemas: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            publish_schemas: true,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    pub fn with_publish_schemas(mut self, publish: bool) -> Self {
        self.publish_schemas = publish;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let enc = EncoderConfig::default();
        assert!(enc.inline_schemas);
        assert_eq!(enc.max_depth, DEFAULT_MAX_DEPTH);

        let dec = DecoderConfig::default();
        assert!(dec.publish_schemas);
        assert_eq!(dec.max_string_len, DEFAULT_MAX_STRING_LEN);
    }

    #[test]
    fn test_builders() {
        let dec = DecoderConfig::new()
            .with_max_depth(4)
            .with_max_collection_len(10)
            .with_max_string_len(32)
            .with_publish_schemas(false);
        assert_eq!(dec.max_depth, 4);
        assert_eq!(dec.max_collection_len, 10);
        assert_eq!(dec.max_string_len, 32);
        assert!(!dec.publish_schemas);

        let enc = EncoderConfig::new().with_inline_schemas(false).with_max_depth(8);
        assert!(!enc.inline_schemas);
        assert_eq!(enc.max_depth, 8);
    }
}
