//! Vector pass: attaches dense vectors from per-field key-value stores.
//!
//! Each vector field has its own store at `vectors/<field>.000`. Stores are
//! iterated in their native key order and the n-th value belongs to the n-th
//! profile record; keys are never interpreted.

#[cfg(feature = "rocksdb")]
pub mod rocks;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::deletion::DeletionIndex;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::schema::VectorFieldDef;

/// A `(key, value)` pair yielded by a vector store.
pub type StoreEntry = (Vec<u8>, Vec<u8>);

/// Read-only ordered key-value store holding packed `f32` vectors.
pub trait VectorStore {
    /// Iterates entries in ascending key order.
    fn entries(&self) -> Box<dyn Iterator<Item = Result<StoreEntry>> + '_>;
}

/// Opens the store backing one vector field.
pub trait VectorStoreOpener: Send + Sync {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if no store exists at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn VectorStore>>;
}

/// Store directory name for a vector field.
#[must_use]
pub fn store_name(field: &str) -> String {
    format!("{field}.000")
}

/// In-memory ordered store.
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryVectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw entry.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Inserts `vector` packed as little-endian `f32` under `key`.
    pub fn insert_vector(&mut self, key: impl Into<Vec<u8>>, vector: &[f32]) {
        let value: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.insert(key, value);
    }

}

impl VectorStore for MemoryVectorStore {
    fn entries(&self) -> Box<dyn Iterator<Item = Result<StoreEntry>> + '_> {
        Box::new(
            self.entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.clone()))),
        )
    }
}

/// Opener serving staged in-memory stores by store directory name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreOpener {
    stores: HashMap<String, MemoryVectorStore>,
}

impl MemoryStoreOpener {
    /// Creates an opener with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the store for vector field `field`.
    #[must_use]
    pub fn with_store(mut self, field: &str, store: MemoryVectorStore) -> Self {
        self.stores.insert(store_name(field), store);
        self
    }
}

impl VectorStoreOpener for MemoryStoreOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn VectorStore>> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.stores.get(name))
            .map(|store| Box::new(store.clone()) as Box<dyn VectorStore>)
            .ok_or_else(|| Error::MissingFile(path.to_path_buf()))
    }
}

/// Opener used when no embedded store backend is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedStoreOpener;

impl VectorStoreOpener for UnsupportedStoreOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn VectorStore>> {
        if !path.exists() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        Err(Error::Store(format!(
            "cannot open {}: built without the `rocksdb` feature",
            path.display()
        )))
    }
}

/// The store backend for on-disk tables.
#[must_use]
pub fn default_opener() -> Box<dyn VectorStoreOpener> {
    #[cfg(feature = "rocksdb")]
    {
        Box::new(rocks::RocksStoreOpener)
    }
    #[cfg(not(feature = "rocksdb"))]
    {
        Box::new(UnsupportedStoreOpener)
    }
}

/// Decodes a store value into `dimension` little-endian `f32` components.
///
/// # Errors
///
/// Returns [`Error::VectorEntry`] if the value is not exactly `4 * dimension`
/// bytes; `entry` is the value's position in key order.
pub fn decode_vector(value: &[u8], dimension: usize, path: &Path, entry: usize) -> Result<Vec<f32>> {
    if value.len() != dimension * 4 {
        return Err(Error::VectorEntry {
            path: path.to_path_buf(),
            entry,
            message: format!(
                "holds {} bytes, expected {} for dimension {dimension}",
                value.len(),
                dimension * 4
            ),
        });
    }
    Ok(value
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Attaches vectors to documents positionally.
pub struct VectorReader<'a> {
    opener: &'a dyn VectorStoreOpener,
}

impl<'a> VectorReader<'a> {
    /// Creates a reader using `opener` to reach each field's store.
    #[must_use]
    pub fn new(opener: &'a dyn VectorStoreOpener) -> Self {
        Self { opener }
    }

    /// Attaches every vector field in `fields` and returns the documents that
    /// received one.
    ///
    /// For each field the document sequence is truncated to the number of
    /// entries its store holds; surplus store entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if a store is absent and
    /// [`Error::VectorEntry`] if an entry has the wrong size.
    pub fn read(
        &self,
        vectors_dir: &Path,
        mut documents: Vec<Document>,
        deletion: &DeletionIndex,
        fields: &[VectorFieldDef],
    ) -> Result<Vec<Document>> {
        for field in fields {
            let path: PathBuf = vectors_dir.join(store_name(&field.name));
            let store = self.opener.open(&path)?;

            let mut count = 0;
            let mut surplus = 0;
            for entry in store.entries() {
                let (_, value) = entry?;
                match documents.get_mut(count) {
                    Some(doc) => {
                        let feature = decode_vector(&value, field.dimension, &path, count)?;
                        doc.set_vector(field.name.as_str(), feature);
                        count += 1;
                    }
                    None => surplus += 1,
                }
            }

            if surplus > 0 {
                warn!(
                    "{}: {} entries beyond the last profile record ignored",
                    path.display(),
                    surplus
                );
            }
            if count < documents.len() {
                debug!(
                    "{}: truncating {} documents without vectors",
                    field.name,
                    documents.len() - count
                );
            }
            documents.truncate(count);
            info!("load vector finished, vec num: {}", count);
        }

        let live = (0..documents.len() as u64)
            .filter(|i| !deletion.is_superseded(*i))
            .count();
        debug!("{} of {} vectorized documents are live", live, documents.len());

        Ok(documents)
    }
}
