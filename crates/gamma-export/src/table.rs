//! On-disk layout of a gamma table and the three-stage decode.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::deletion::DeletionIndex;
use crate::document::Document;
use crate::error::Result;
use crate::profile::{IdWidth, ProfileReader};
use crate::schema::{Schema, SchemaReader};
use crate::vectors::{VectorReader, VectorStoreOpener};

/// Paths of one table under a gamma data directory.
#[derive(Debug, Clone)]
pub struct TableLayout {
    dir: PathBuf,
    table: String,
}

impl TableLayout {
    /// Layout of `table` under the data directory `root`.
    #[must_use]
    pub fn new(root: &Path, table: &str) -> Self {
        Self {
            dir: root.join(table),
            table: table.to_string(),
        }
    }

    /// Table directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<table>/<table>.schema`.
    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(format!("{}.schema", self.table))
    }

    /// Directory holding the numbered profile segments.
    #[must_use]
    pub fn profile_dir(&self) -> PathBuf {
        self.dir.join("table")
    }

    /// Directory holding one store per vector field.
    #[must_use]
    pub fn vectors_dir(&self) -> PathBuf {
        self.dir.join("vectors")
    }
}

/// A fully decoded table.
#[derive(Debug)]
pub struct LoadedTable {
    /// Table schema.
    pub schema: Schema,
    /// Documents with every vector field attached, in record order.
    pub documents: Vec<Document>,
    /// Superseded record bookkeeping.
    pub deletion: DeletionIndex,
}

impl LoadedTable {
    /// Reads the schema, the profile segments, then the vector stores.
    ///
    /// # Errors
    ///
    /// Any decode error aborts the load.
    pub fn load(
        layout: &TableLayout,
        id_width: IdWidth,
        opener: &dyn VectorStoreOpener,
    ) -> Result<Self> {
        let schema = SchemaReader::read(&layout.schema_path())?;
        let scan = ProfileReader::new(&schema, id_width).read(&layout.profile_dir())?;
        let documents = VectorReader::new(opener).read(
            &layout.vectors_dir(),
            scan.documents,
            &scan.deletion,
            &schema.vectors,
        )?;

        info!(
            "table {} loaded: {} segments, {} documents, {} live ids, {} superseded",
            layout.dir().display(),
            scan.segments,
            documents.len(),
            scan.deletion.live_count(),
            scan.deletion.superseded_count()
        );

        Ok(Self {
            schema,
            documents,
            deletion: scan.deletion,
        })
    }

    /// Name of the vector field that gates export eligibility.
    #[must_use]
    pub fn primary_vector(&self) -> Option<&str> {
        self.schema.primary_vector().map(|v| v.name.as_str())
    }
}
