//! Reconstructed documents and their JSON renderings.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::ID_FIELD;

/// A decoded scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 4-byte signed integer.
    Int32(i32),
    /// 8-byte unsigned integer.
    UInt64(u64),
    /// 4-byte float.
    Float32(f32),
    /// 8-byte float.
    Float64(f64),
    /// Text from the string store.
    String(String),
}

impl FieldValue {
    /// Returns the text if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::UInt64(v) => serializer.serialize_u64(*v),
            Self::Float32(v) => serializer.serialize_f32(*v),
            Self::Float64(v) => serializer.serialize_f64(*v),
            Self::String(v) => serializer.serialize_str(v),
        }
    }
}

/// Vector sub-structure attached to a document, rendered as `{"feature": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorFeature {
    /// Vector components, `dimension` long.
    pub feature: Vec<f32>,
}

/// A table row: scalar fields in schema order plus attached vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: IndexMap<String, FieldValue>,
    vectors: IndexMap<String, VectorFeature>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar field.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Returns a scalar field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Scalar fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The document identifier, if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(FieldValue::as_str)
    }

    /// Attaches the vector for `field`.
    pub fn set_vector(&mut self, field: impl Into<String>, feature: Vec<f32>) {
        self.vectors.insert(field.into(), VectorFeature { feature });
    }

    /// Returns the vector attached for `field`.
    #[must_use]
    pub fn vector(&self, field: &str) -> Option<&[f32]> {
        self.vectors.get(field).map(|v| v.feature.as_slice())
    }

    /// Whether a vector is attached for `field`.
    #[must_use]
    pub fn has_vector(&self, field: &str) -> bool {
        self.vectors.contains_key(field)
    }

    /// Rejects NaN and infinite floats, which JSON cannot carry.
    fn ensure_finite(&self) -> Result<()> {
        let scalar = self.fields().find_map(|(name, value)| match value {
            FieldValue::Float32(v) if !v.is_finite() => Some((name, v.to_string())),
            FieldValue::Float64(v) if !v.is_finite() => Some((name, v.to_string())),
            _ => None,
        });
        let vector = || {
            self.vectors.iter().find_map(|(name, v)| {
                v.feature
                    .iter()
                    .find(|c| !c.is_finite())
                    .map(|c| (name.as_str(), c.to_string()))
            })
        };

        match scalar.or_else(vector) {
            Some((field, value)) => Err(Error::NonFinite {
                id: self.id().unwrap_or_default().to_string(),
                field: field.to_string(),
                value,
            }),
            None => Ok(()),
        }
    }

    /// Renders the local-file line: the full document, `_id` included, no newline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFinite`] for NaN or infinite values, or an error if
    /// serialization fails.
    pub fn to_json_line(&self) -> Result<String> {
        self.ensure_finite()?;
        Ok(serde_json::to_string(&DocumentView {
            doc: self,
            with_id: true,
        })?)
    }

    /// Appends the bulk action line and body line for this document to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pipeline`] if the document has no `_id`.
    pub fn write_bulk_entry(&self, out: &mut String) -> Result<()> {
        let id = self
            .id()
            .ok_or_else(|| Error::Pipeline("document without _id in bulk batch".to_string()))?;
        out.push_str(&serde_json::to_string(&BulkAction {
            index: BulkTarget { id },
        })?);
        out.push('\n');
        out.push_str(&self.body_json()?);
        out.push('\n');
        Ok(())
    }

    /// Renders the document without `_id`, as sent in bulk and single-document requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFinite`] for NaN or infinite values, or an error if
    /// serialization fails.
    pub fn body_json(&self) -> Result<String> {
        self.ensure_finite()?;
        Ok(serde_json::to_string(&DocumentView {
            doc: self,
            with_id: false,
        })?)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        DocumentView {
            doc: self,
            with_id: true,
        }
        .serialize(serializer)
    }
}

struct DocumentView<'a> {
    doc: &'a Document,
    with_id: bool,
}

impl Serialize for DocumentView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.doc.fields() {
            if !self.with_id && name == ID_FIELD {
                continue;
            }
            map.serialize_entry(name, value)?;
        }
        for (name, vector) in &self.doc.vectors {
            map.serialize_entry(name, vector)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkTarget<'a>,
}

#[derive(Serialize)]
struct BulkTarget<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
}
