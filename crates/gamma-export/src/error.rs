//! Error types for gamma-export.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a table or exporting its documents.
///
/// Decode-phase errors (`Format`, `MissingFile`) abort the run. `Upload` is
/// reported per batch by the remote sink and never aborts the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unexpected binary layout.
    #[error("Format error in {path}: {message} (offset {offset})")]
    Format {
        /// File being decoded.
        path: PathBuf,
        /// Byte offset at which decoding failed.
        offset: u64,
        /// What was wrong.
        message: String,
    },

    /// A vector store entry does not decode to a vector of the field's dimension.
    #[error("Format error in {path}: entry {entry}: {message}")]
    VectorEntry {
        /// Store being read.
        path: PathBuf,
        /// Zero-based position of the entry in key order.
        entry: usize,
        /// What was wrong.
        message: String,
    },

    /// A document holds a float that JSON cannot represent.
    #[error("Document {id}: field {field} holds non-finite value {value}")]
    NonFinite {
        /// Document identifier.
        id: String,
        /// Scalar or vector field holding the value.
        field: String,
        /// The offending value.
        value: String,
    },

    /// A file the table layout requires is absent.
    #[error("Missing file: {0}")]
    MissingFile(PathBuf),

    /// A bulk or document request failed.
    #[error("Upload failed with status {status}: {body}")]
    Upload {
        /// HTTP status code (0 for transport failures).
        status: u16,
        /// Response body or transport error message.
        body: String,
    },

    /// A queue wait exceeded the configured timeout.
    #[error("Queue wait timed out after {0}s: {1}")]
    QueueTimeout(u64, &'static str),

    /// The export pipeline shut down abnormally.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector store error.
    #[error("Vector store error: {0}")]
    Store(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Builds a [`Error::Format`] for `path` at `offset`.
    pub fn format(path: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            offset,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let err = Error::format("/data/1/table/0.profile", 46, "truncated record");
        let msg = err.to_string();
        assert!(msg.contains("0.profile"));
        assert!(msg.contains("offset 46"));
        assert!(msg.contains("truncated record"));
    }

    #[test]
    fn test_vector_entry_display_names_entry_not_offset() {
        let err = Error::VectorEntry {
            path: PathBuf::from("/data/1/vectors/image.000"),
            entry: 7,
            message: "holds 6 bytes".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("image.000"));
        assert!(msg.contains("entry 7"));
        assert!(!msg.contains("offset"));
    }

    #[test]
    fn test_non_finite_display() {
        let err = Error::NonFinite {
            id: "a".to_string(),
            field: "score".to_string(),
            value: f32::NAN.to_string(),
        };
        assert_eq!(err.to_string(), "Document a: field score holds non-finite value NaN");
    }
}
