// Export tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # gamma-export
//!
//! `gamma-export` is a CLI tool and library that reads a gamma vector table
//! straight from its data directory and exports the live documents either to
//! a line-delimited JSON file or to the bulk endpoint of a search service.
//!
//! ## Table layout
//!
//! | Path | Content |
//! |------|---------|
//! | `<table>/<table>.schema` | scalar and vector field descriptors |
//! | `<table>/table/<n>.profile` | fixed-layout scalar records |
//! | `<table>/table/<n>.str.profile` | bytes of string fields |
//! | `<table>/vectors/<field>.000` | one key-value store per vector field |
//!
//! ## Quick Start
//!
//! ```bash
//! # To a local file
//! gamma-export -f ./data -t 1 --int64 -s ./out/docs.txt
//!
//! # To a bulk endpoint
//! gamma-export -f ./data -t 1 -u http://router:9001/db/space
//!
//! # From a config file
//! gamma-export --config export.yaml
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   path: ./data
//!   table: "1"
//!   wide_ids: true
//!
//! sink:
//!   type: bulk
//!   url: http://router:9001/db/space
//!
//! options:
//!   batch_size: 50
//!   batchers: 10
//!   uploaders: 16
//! ```

#![warn(missing_docs)]

pub mod binary;
pub mod config;
pub mod deletion;
pub mod document;
pub mod error;
pub mod export;
pub mod http;
pub mod profile;
pub mod schema;
pub mod table;
pub mod vectors;

pub use config::{ExportConfig, ExportOptions, SinkConfig, SourceConfig};
pub use deletion::{DeletionIndex, DeletionIndexBuilder};
pub use document::{Document, FieldValue, VectorFeature};
pub use error::{Error, Result};
pub use export::{export, DocumentSink, ExportStats};
pub use profile::{IdWidth, ProfileReader, ProfileScan};
pub use schema::{FieldType, Schema, SchemaReader};
pub use table::{LoadedTable, TableLayout};
pub use vectors::{VectorReader, VectorStore, VectorStoreOpener};

use std::sync::Arc;
use std::time::Duration;

/// Builds the sink described by `config`.
#[must_use]
pub fn create_sink(config: &ExportConfig) -> Box<dyn DocumentSink> {
    let timeout = Duration::from_secs(config.options.request_timeout_secs);
    match &config.sink {
        SinkConfig::File { path } => Box::new(export::FileSink::new(path.clone())),
        SinkConfig::Bulk { url } => Box::new(export::BulkSink::new(
            url,
            export::PipelineOptions::from(&config.options),
            timeout,
        )),
        SinkConfig::Document { url } => Box::new(export::DocumentPostSink::new(url, timeout)),
    }
}

/// Loads the configured table and exports it.
///
/// The table is decoded on the blocking thread pool.
///
/// # Errors
///
/// Returns the first fatal decode or pipeline error.
pub async fn run(config: &ExportConfig, opener: Arc<dyn VectorStoreOpener>) -> Result<ExportStats> {
    let layout = TableLayout::new(&config.source.path, &config.source.table);
    let id_width = config.source.id_width();
    let table =
        tokio::task::spawn_blocking(move || LoadedTable::load(&layout, id_width, opener.as_ref()))
            .await
            .map_err(|e| Error::Pipeline(format!("table load panicked: {e}")))??;
    let sink = create_sink(config);
    export(
        &table.documents,
        &table.deletion,
        table.primary_vector(),
        sink.as_ref(),
    )
    .await
}
