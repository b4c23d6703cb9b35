//! Little-endian cursor over gamma binary files.
//!
//! Every read advances a tracked byte offset so decode failures can report
//! exactly where a file stopped matching the expected layout.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Reader that decodes fixed-width little-endian values and tracks its offset.
pub struct ByteCursor<R> {
    inner: R,
    path: PathBuf,
    offset: u64,
}

impl<R: Read> ByteCursor<R> {
    /// Wraps `inner`, positioned at the start of the file at `path`.
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            offset: 0,
        }
    }

    /// Current byte offset from the start of the file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Path of the file being decoded.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds a format error at the current offset.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::format(self.path.clone(), self.offset, message)
    }

    fn fill<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.io_error(e, what))?;
        self.offset += N as u64;
        Ok(buf)
    }

    fn io_error(&self, e: io::Error, what: &str) -> Error {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            self.error(format!("unexpected end of file reading {what}"))
        } else {
            Error::Io(e)
        }
    }

    /// Reads one byte.
    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.fill::<1>(what)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self, what: &str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self, what: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self, what: &str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self, what: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian IEEE-754 `f32`.
    pub fn read_f32(&mut self, what: &str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.fill(what)?))
    }

    /// Reads a little-endian IEEE-754 `f64`.
    pub fn read_f64(&mut self, what: &str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.fill(what)?))
    }

    /// Reads a non-negative `i32` length or count.
    pub fn read_len(&mut self, what: &str) -> Result<usize> {
        let start = self.offset;
        let value = self.read_i32(what)?;
        usize::try_from(value)
            .map_err(|_| Error::format(self.path.clone(), start, format!("negative {what}: {value}")))
    }

    /// Reads `len` bytes and decodes them as UTF-8.
    pub fn read_string(&mut self, len: usize, what: &str) -> Result<String> {
        let start = self.offset;
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.io_error(e, what))?;
        self.offset += len as u64;
        String::from_utf8(buf)
            .map_err(|_| Error::format(self.path.clone(), start, format!("{what} is not valid UTF-8")))
    }
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Moves to an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }
}
