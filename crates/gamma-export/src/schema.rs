//! Table schema descriptor (`<table>.schema`).
//!
//! Field order in the schema fixes the byte layout of every profile record,
//! and vector field order fixes which vector store each field reads from.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::binary::ByteCursor;
use crate::error::{Error, Result};

/// Reserved identifier field carried by every document.
pub const ID_FIELD: &str = "_id";

/// Scalar field type as encoded in the schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 4-byte signed integer.
    Int32,
    /// 8-byte unsigned integer.
    UInt64,
    /// 4-byte IEEE-754 float.
    Float32,
    /// 8-byte IEEE-754 float.
    Float64,
    /// (offset, length) reference into the segment string store.
    String,
}

impl FieldType {
    /// Maps a schema type code to a field type.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Int32),
            1 => Some(Self::UInt64),
            2 => Some(Self::Float32),
            3 => Some(Self::Float64),
            4 => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int32 => "int",
            Self::UInt64 => "long",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// A scalar field of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
}

/// A vector field of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorFieldDef {
    /// Field name, also the name of its vector store.
    pub name: String,
    /// Raw type code. Values are always decoded as packed `f32`.
    pub type_code: u16,
    /// Number of `f32` components per vector.
    pub dimension: usize,
}

/// Parsed table schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Number of indexes declared by the table (informational).
    pub index_count: i32,
    /// Scalar fields in record byte order.
    pub fields: Vec<FieldDef>,
    /// Vector fields in store order.
    pub vectors: Vec<VectorFieldDef>,
}

impl Schema {
    /// Looks up a scalar field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The vector field that gates export eligibility.
    #[must_use]
    pub fn primary_vector(&self) -> Option<&VectorFieldDef> {
        self.vectors.first()
    }
}

/// Reads schema descriptor files.
pub struct SchemaReader;

impl SchemaReader {
    /// Reads and parses the schema file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if the file does not exist and
    /// [`Error::Format`] if its layout is malformed or a scalar type code is
    /// unknown.
    pub fn read(path: &Path) -> Result<Schema> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let schema = Self::parse(BufReader::new(file), path)?;

        info!(
            "schema info: [index_num: {}, field_num: {}, field_names: {:?}, field_types: {:?}, vector_num: {}, vector_names: {:?}, dimensions: {:?}]",
            schema.index_count,
            schema.fields.len(),
            schema.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            schema.fields.iter().map(|f| f.field_type.to_string()).collect::<Vec<_>>(),
            schema.vectors.len(),
            schema.vectors.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            schema.vectors.iter().map(|v| v.dimension).collect::<Vec<_>>(),
        );

        Ok(schema)
    }

    /// Parses a schema from any reader; `path` is used for error context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] on malformed input.
    pub fn parse<R: Read>(reader: R, path: &Path) -> Result<Schema> {
        let mut cursor = ByteCursor::new(reader, path);

        let index_count = cursor.read_i32("index count")?;
        let field_count = cursor.read_len("field count")?;

        let mut fields = Vec::with_capacity(field_count.min(1024));
        for _ in 0..field_count {
            let name_len = cursor.read_len("field name length")?;
            let name = cursor.read_string(name_len, "field name")?;
            let code_offset = cursor.offset();
            let code = cursor.read_u16("field type")?;
            let field_type = FieldType::from_code(code).ok_or_else(|| {
                Error::format(
                    path,
                    code_offset,
                    format!("field type[{code}] of '{name}' is not known"),
                )
            })?;
            cursor.read_u8("reserved byte")?;
            fields.push(FieldDef { name, field_type });
        }

        let vector_count = cursor.read_len("vector count")?;
        let mut vectors = Vec::with_capacity(vector_count.min(64));
        for _ in 0..vector_count {
            let name_len = cursor.read_len("vector name length")?;
            let name = cursor.read_string(name_len, "vector name")?;
            let type_code = cursor.read_u16("vector type")?;
            cursor.read_u8("reserved byte")?;
            let dimension = cursor.read_len("vector dimension")?;
            vectors.push(VectorFieldDef {
                name,
                type_code,
                dimension,
            });
        }

        Ok(Schema {
            index_count,
            fields,
            vectors,
        })
    }
}
