//! Fixed-layout scalar records (`table/<n>.profile` + `table/<n>.str.profile`).
//!
//! Segments are numbered from zero and read until the next profile file is
//! absent. Each segment starts with a 5-byte preamble, an `i32` record count
//! at offset 5, and header padding; records begin at byte 54 when the store was
//! built with wide ids and at byte 46 otherwise. String fields hold an
//! (offset, length) reference into the segment's companion string store.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binary::ByteCursor;
use crate::deletion::{DeletionIndex, DeletionIndexBuilder};
use crate::document::{Document, FieldValue};
use crate::error::{Error, Result};
use crate::schema::{FieldType, Schema, ID_FIELD};

/// Offset of the `i32` record count within a segment.
pub const RECORD_COUNT_OFFSET: u64 = 5;

/// Width of string references, fixed when the source store was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdWidth {
    /// `u32` offset + `u8` length; records start at byte 46.
    #[default]
    Narrow,
    /// `i64` offset + `u16` length; records start at byte 54.
    Wide,
}

impl IdWidth {
    /// Builds the mode from the `--int64` style flag.
    #[must_use]
    pub const fn from_wide(wide: bool) -> Self {
        if wide {
            Self::Wide
        } else {
            Self::Narrow
        }
    }

    /// Absolute offset of the first record in a segment.
    #[must_use]
    pub const fn records_start(self) -> u64 {
        match self {
            Self::Narrow => 46,
            Self::Wide => 54,
        }
    }
}

/// Paths of segment `n` inside `profile_dir`.
#[must_use]
pub fn segment_paths(profile_dir: &Path, n: usize) -> (PathBuf, PathBuf) {
    (
        profile_dir.join(format!("{n}.profile")),
        profile_dir.join(format!("{n}.str.profile")),
    )
}

/// Output of the scalar pass.
#[derive(Debug, Default)]
pub struct ProfileScan {
    /// Documents in record-index order, scalar fields only.
    pub documents: Vec<Document>,
    /// Frozen deletion index over the scanned records.
    pub deletion: DeletionIndex,
    /// Number of segments read.
    pub segments: usize,
}

/// Reads profile segments into documents.
pub struct ProfileReader<'a> {
    schema: &'a Schema,
    id_width: IdWidth,
}

impl<'a> ProfileReader<'a> {
    /// Creates a reader decoding records laid out by `schema`.
    #[must_use]
    pub fn new(schema: &'a Schema, id_width: IdWidth) -> Self {
        Self { schema, id_width }
    }

    /// Reads every segment under `profile_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if segment 0 or any companion string
    /// store is absent, and [`Error::Format`] on any layout violation.
    pub fn read(&self, profile_dir: &Path) -> Result<ProfileScan> {
        match self.schema.field(ID_FIELD) {
            Some(field) if field.field_type == FieldType::String => {}
            _ => {
                return Err(Error::format(
                    profile_dir,
                    0,
                    format!("schema has no string '{ID_FIELD}' field"),
                ))
            }
        }

        let mut documents = Vec::new();
        let mut deletion = DeletionIndexBuilder::new();
        let mut segment = 0;

        loop {
            let (profile_path, str_path) = segment_paths(profile_dir, segment);
            if !profile_path.exists() {
                if segment == 0 {
                    return Err(Error::MissingFile(profile_path));
                }
                break;
            }

            let profile = open(&profile_path)?;
            let strings = open(&str_path)?;
            let count = self.read_segment(
                ByteCursor::new(BufReader::new(profile), &profile_path),
                StringStore::new(ByteCursor::new(BufReader::new(strings), &str_path)),
                &mut documents,
                &mut deletion,
            )?;
            info!("profile_path: {}, size: {}", profile_path.display(), count);
            segment += 1;
        }

        let deletion = deletion.freeze();
        info!(
            "load profile finished, docs num: {}, delete num: {}",
            documents.len(),
            deletion.superseded_count()
        );

        Ok(ProfileScan {
            documents,
            deletion,
            segments: segment,
        })
    }

    /// Decodes one segment, appending to `documents`. Returns its record count.
    fn read_segment<R, S>(
        &self,
        mut cursor: ByteCursor<R>,
        mut strings: StringStore<S>,
        documents: &mut Vec<Document>,
        deletion: &mut DeletionIndexBuilder,
    ) -> Result<usize>
    where
        R: Read + Seek,
        S: Read + Seek,
    {
        cursor.seek_to(RECORD_COUNT_OFFSET)?;
        let count = cursor.read_len("record count")?;
        cursor.seek_to(self.id_width.records_start())?;
        debug!(
            "{}: {} records from offset {}",
            cursor.path().display(),
            count,
            cursor.offset()
        );

        for n in 0..count {
            let doc = self
                .read_record(&mut cursor, &mut strings)
                .map_err(|e| in_record(e, n, count))?;
            let record_index = documents.len() as u64;
            let id = doc
                .id()
                .ok_or_else(|| cursor.error(format!("record {n} has no {ID_FIELD}")))?;
            deletion.observe(id, record_index);
            documents.push(doc);
        }

        Ok(count)
    }

    fn read_record<R, S>(
        &self,
        cursor: &mut ByteCursor<R>,
        strings: &mut StringStore<S>,
    ) -> Result<Document>
    where
        R: Read + Seek,
        S: Read + Seek,
    {
        let mut doc = Document::new();
        for field in &self.schema.fields {
            let name = field.name.as_str();
            let value = match field.field_type {
                FieldType::Int32 => FieldValue::Int32(cursor.read_i32(name)?),
                FieldType::UInt64 => FieldValue::UInt64(cursor.read_u64(name)?),
                FieldType::Float32 => FieldValue::Float32(cursor.read_f32(name)?),
                FieldType::Float64 => FieldValue::Float64(cursor.read_f64(name)?),
                FieldType::String => {
                    let (offset, len) = match self.id_width {
                        IdWidth::Wide => {
                            let at = cursor.offset();
                            let offset = cursor.read_i64(name)?;
                            let offset = u64::try_from(offset).map_err(|_| {
                                Error::format(
                                    cursor.path(),
                                    at,
                                    format!("negative string offset {offset} for '{name}'"),
                                )
                            })?;
                            (offset, usize::from(cursor.read_u16(name)?))
                        }
                        IdWidth::Narrow => (
                            u64::from(cursor.read_u32(name)?),
                            usize::from(cursor.read_u8(name)?),
                        ),
                    };
                    FieldValue::String(strings.read(offset, len, name)?)
                }
            };
            doc.insert(name, value);
        }
        Ok(doc)
    }
}

/// Companion store holding the bytes of every string field in a segment.
struct StringStore<S> {
    cursor: ByteCursor<S>,
}

impl<S: Read + Seek> StringStore<S> {
    fn new(cursor: ByteCursor<S>) -> Self {
        Self { cursor }
    }

    fn read(&mut self, offset: u64, len: usize, field: &str) -> Result<String> {
        self.cursor.seek_to(offset)?;
        self.cursor.read_string(len, field)
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

fn in_record(err: Error, n: usize, count: usize) -> Error {
    match err {
        Error::Format {
            path,
            offset,
            message,
        } => Error::Format {
            path,
            offset,
            message: format!("record {n} of {count}: {message}"),
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
