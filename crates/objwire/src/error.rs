// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the registry, encoder and decoder.

use std::fmt;
use std::io;

/// Errors returned by objwire operations.
///
/// None of these are recoverable at the point they are raised: a stream that
/// produced an error cannot be resynchronized, so the current
/// [`Encoder::object`](crate::Encoder::object) or
/// [`Decoder::object`](crate::Decoder::object) call is aborted and the caller
/// decides whether to retry on a fresh stream.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Schema Errors
    // ========================================================================
    /// A signature was referenced but never registered nor inlined.
    UnknownEntity(String),
    /// An entity definition is invalid (fields set twice, by-value cycle, ...).
    Schema(String),

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// Structurally invalid bytes (bad tag, bad id sequence, bad UTF-8, ...).
    Malformed(String),
    /// The transport ended in the middle of a record.
    UnexpectedEof,
    /// A configured decoder/encoder limit was exceeded.
    LimitExceeded(String),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// A value does not match the declared type of its field.
    TypeMismatch { expected: String, found: String },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Underlying I/O failure (other than end of stream).
    Io(io::Error),
}

impl Error {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownEntity(signature) => write!(f, "Unknown entity: {}", signature),
            Error::Schema(msg) => write!(f, "Invalid schema: {}", msg),
            Error::Malformed(msg) => write!(f, "Malformed stream: {}", msg),
            Error::UnexpectedEof => write!(f, "Unexpected end of stream"),
            Error::LimitExceeded(msg) => write!(f, "Limit exceeded: {}", msg),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}

/// Result alias for objwire operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_io_error_maps_to_unexpected_eof() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(matches!(err, Error::UnexpectedEof));

        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_display_variants() {
        assert_eq!(
            Error::UnknownEntity("path.Atom#00".into()).to_string(),
            "Unknown entity: path.Atom#00"
        );
        assert_eq!(
            Error::mismatch("uint32", "string").to_string(),
            "Type mismatch: expected uint32, found string"
        );
        assert_eq!(Error::UnexpectedEof.to_string(), "Unexpected end of stream");
    }
}
