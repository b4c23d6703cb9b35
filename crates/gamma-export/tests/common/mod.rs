//! Common test utilities: writes synthetic gamma tables to disk.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gamma_export::profile::{segment_paths, IdWidth};
use gamma_export::vectors::{MemoryStoreOpener, MemoryVectorStore};
use tempfile::TempDir;

pub const TABLE: &str = "1";
pub const DIMENSION: usize = 4;

/// Type codes: 0 int, 1 long, 2 float, 3 double, 4 string.
const FIELDS: [(&str, u16); 5] = [
    ("_id", 4),
    ("age", 0),
    ("ts", 1),
    ("score", 2),
    ("tag", 4),
];

/// A row of the fixture table.
#[derive(Debug, Clone)]
pub struct Row {
    pub id: String,
    pub age: i32,
}

impl Row {
    pub fn new(id: &str, age: i32) -> Self {
        Self {
            id: id.to_string(),
            age,
        }
    }

    pub fn vector(&self) -> Vec<f32> {
        (0..DIMENSION).map(|d| self.age as f32 + d as f32 / 10.0).collect()
    }
}

/// A gamma table written into a temporary data directory.
pub struct TableFixture {
    pub root: TempDir,
    pub width: IdWidth,
    pub vector_fields: Vec<&'static str>,
}

impl TableFixture {
    pub fn new(width: IdWidth, vector_fields: &[&'static str]) -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join(TABLE).join("table")).unwrap();
        fs::create_dir_all(root.path().join(TABLE).join("vectors")).unwrap();
        let fixture = Self {
            root,
            width,
            vector_fields: vector_fields.to_vec(),
        };
        fixture.write_schema();
        fixture
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    fn table_dir(&self) -> PathBuf {
        self.root.path().join(TABLE)
    }

    fn write_schema(&self) {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&(FIELDS.len() as i32).to_le_bytes());
        for (name, code) in FIELDS {
            buf.extend_from_slice(&(name.len() as i32).to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(&code.to_le_bytes());
            buf.push(0);
        }
        buf.extend_from_slice(&(self.vector_fields.len() as i32).to_le_bytes());
        for name in &self.vector_fields {
            buf.extend_from_slice(&(name.len() as i32).to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(&2u16.to_le_bytes());
            buf.push(0);
            buf.extend_from_slice(&(DIMENSION as i32).to_le_bytes());
        }
        fs::write(self.table_dir().join(format!("{TABLE}.schema")), buf).unwrap();
    }

    /// Writes segment `n` holding `rows`.
    pub fn write_segment(&self, n: usize, rows: &[Row]) {
        let mut profile = vec![0u8; self.width.records_start() as usize];
        profile[5..9].copy_from_slice(&(rows.len() as i32).to_le_bytes());
        let mut strings = Vec::new();

        for row in rows {
            let tag = format!("tag-{}", row.age);
            self.string_ref(&mut profile, &mut strings, &row.id);
            profile.extend_from_slice(&row.age.to_le_bytes());
            profile.extend_from_slice(&(row.age as u64).to_le_bytes());
            profile.extend_from_slice(&(row.age as f32 * 0.5).to_le_bytes());
            self.string_ref(&mut profile, &mut strings, &tag);
        }

        let (profile_path, str_path) = segment_paths(&self.table_dir().join("table"), n);
        fs::write(profile_path, profile).unwrap();
        fs::write(str_path, strings).unwrap();
    }

    fn string_ref(&self, profile: &mut Vec<u8>, strings: &mut Vec<u8>, value: &str) {
        let offset = strings.len();
        strings.extend_from_slice(value.as_bytes());
        match self.width {
            IdWidth::Wide => {
                profile.extend_from_slice(&(offset as i64).to_le_bytes());
                profile.extend_from_slice(&(value.len() as u16).to_le_bytes());
            }
            IdWidth::Narrow => {
                profile.extend_from_slice(&(offset as u32).to_le_bytes());
                profile.push(value.len() as u8);
            }
        }
    }
}

/// Builds a store holding the vectors of `rows` in row order.
pub fn store_for(rows: &[Row]) -> MemoryVectorStore {
    let mut store = MemoryVectorStore::new();
    for (i, row) in rows.iter().enumerate() {
        store.insert_vector((i as u64).to_be_bytes(), &row.vector());
    }
    store
}

/// Opener serving `store` for the `image` field.
pub fn opener(store: MemoryVectorStore) -> MemoryStoreOpener {
    MemoryStoreOpener::new().with_store("image", store)
}

pub fn rows(prefix: &str, count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| Row::new(&format!("{prefix}{i}"), i as i32))
        .collect()
}
