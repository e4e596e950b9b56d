// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian primitive reader/writer over a byte transport.
//!
//! Every integer is written at its declared width, never widened. Strings
//! are a `u32` byte length followed by UTF-8 (no terminator).

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Generate write methods for primitive types.
///
/// Each generated method converts the value via `to_le_bytes()` and
/// forwards to `write_bytes`, which tracks the byte count.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) -> Result<()> {
            self.write_bytes(&value.to_le_bytes())
        }
    };
}

/// Generate read methods for primitive types.
///
/// Each generated method reads exactly `$size` bytes (a short read is
/// reported as [`Error::UnexpectedEof`]) and converts via `from_le_bytes()`.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            self.read_exact(&mut bytes)?;
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Writer half.
pub struct WireWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Write a `u32` element count.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = u32::try_from(count)
            .map_err(|_| Error::LimitExceeded(format!("count {} exceeds u32", count)))?;
        self.write_u32(count)
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_count(value.len())?;
        self.write_bytes(value.as_bytes())
    }
}

/// Reader half.
pub struct WireReader<R: Read> {
    inner: R,
    read: u64,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, read: 0 }
    }

    /// Bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.read += buf.len() as u64;
        Ok(())
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.read;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Malformed(format!(
                "invalid bool byte {:#04x} at offset {}",
                other, offset
            ))),
        }
    }

    /// Read a `u32` element count and check it against `max`.
    pub fn read_count(&mut self, max: usize) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count > max {
            return Err(Error::LimitExceeded(format!(
                "count {} exceeds limit {}",
                count, max
            )));
        }
        Ok(count)
    }

    pub fn read_string(&mut self, max_len: usize) -> Result<String> {
        let len = self.read_u32()? as usize;
        if len > max_len {
            return Err(Error::LimitExceeded(format!(
                "string length {} exceeds limit {}",
                len, max_len
            )));
        }
        let offset = self.read;
        // Grow with the data actually present so a bogus length cannot force a
        // large allocation.
        let mut bytes = Vec::with_capacity(len.min(4096));
        let got = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        self.read += got as u64;
        if got < len {
            return Err(Error::UnexpectedEof);
        }
        String::from_utf8(bytes)
            .map_err(|e| Error::Malformed(format!("invalid UTF-8 at offset {}: {}", offset, e)))
    }
}
