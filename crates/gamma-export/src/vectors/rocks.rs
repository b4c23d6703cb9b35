//! RocksDB-backed vector stores (`rocksdb` feature).

use std::path::Path;

use rocksdb::{IteratorMode, Options, DB};

use super::{StoreEntry, VectorStore, VectorStoreOpener};
use crate::error::{Error, Result};

/// A vector store opened read-only.
pub struct RocksVectorStore {
    db: DB,
}

impl RocksVectorStore {
    /// Opens the database at `path` without taking the write lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if `path` does not exist and
    /// [`Error::Store`] if RocksDB refuses to open it.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let db = DB::open_for_read_only(&Options::default(), path, false)
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
        Ok(Self { db })
    }
}

impl VectorStore for RocksVectorStore {
    fn entries(&self) -> Box<dyn Iterator<Item = Result<StoreEntry>> + '_> {
        Box::new(self.db.iterator(IteratorMode::Start).map(|item| {
            item.map(|(k, v)| (k.into_vec(), v.into_vec()))
                .map_err(|e| Error::Store(e.to_string()))
        }))
    }
}

/// Opens each field's store as a read-only RocksDB database.
#[derive(Debug, Clone, Copy, Default)]
pub struct RocksStoreOpener;

impl VectorStoreOpener for RocksStoreOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn VectorStore>> {
        Ok(Box::new(RocksVectorStore::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.000");
        {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            let db = DB::open(&opts, &path).unwrap();
            db.put([2u8], 2.0f32.to_le_bytes()).unwrap();
            db.put([1u8], 1.0f32.to_le_bytes()).unwrap();
        }

        let store = RocksVectorStore::open(&path).unwrap();
        let values: Vec<Vec<u8>> = store.entries().map(|e| e.unwrap().1).collect();
        assert_eq!(values, vec![1.0f32.to_le_bytes().to_vec(), 2.0f32.to_le_bytes().to_vec()]);
    }

    #[test]
    fn test_default_opener_reads_rocksdb_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.000");
        {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            let db = DB::open(&opts, &path).unwrap();
            db.put([0u8], [0.5f32, 1.5].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>())
                .unwrap();
        }

        let store = crate::vectors::default_opener().open(&path).unwrap();
        let entries: Vec<StoreEntry> = store.entries().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            crate::vectors::decode_vector(&entries[0].1, 2, &path, 0).unwrap(),
            vec![0.5, 1.5]
        );
    }

    #[test]
    fn test_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RocksStoreOpener.open(&dir.path().join("nope.000")),
            Err(Error::MissingFile(_))
        ));
    }
}
