//! Tests for the profile segment reader.

use super::*;
use crate::schema::{FieldDef, VectorFieldDef};
use std::fs;
use tempfile::TempDir;

fn schema() -> Schema {
    let field = |name: &str, field_type| FieldDef {
        name: name.to_string(),
        field_type,
    };
    Schema {
        index_count: 1,
        fields: vec![
            field("_id", FieldType::String),
            field("age", FieldType::Int32),
            field("ts", FieldType::UInt64),
            field("score", FieldType::Float32),
            field("weight", FieldType::Float64),
        ],
        vectors: vec![VectorFieldDef {
            name: "image".to_string(),
            type_code: 2,
            dimension: 2,
        }],
    }
}

/// Builds one segment and its string store.
struct SegmentBuilder {
    width: IdWidth,
    records: Vec<u8>,
    count: i32,
    strings: Vec<u8>,
}

impl SegmentBuilder {
    fn new(width: IdWidth) -> Self {
        Self {
            width,
            records: Vec::new(),
            count: 0,
            strings: Vec::new(),
        }
    }

    fn string_ref(&mut self, value: &str) {
        let offset = self.strings.len();
        self.strings.extend_from_slice(value.as_bytes());
        match self.width {
            IdWidth::Wide => {
                self.records.extend_from_slice(&(offset as i64).to_le_bytes());
                self.records.extend_from_slice(&(value.len() as u16).to_le_bytes());
            }
            IdWidth::Narrow => {
                self.records.extend_from_slice(&(offset as u32).to_le_bytes());
                self.records.push(value.len() as u8);
            }
        }
    }

    fn record(mut self, id: &str, age: i32) -> Self {
        self.string_ref(id);
        self.records.extend_from_slice(&age.to_le_bytes());
        self.records.extend_from_slice(&(u64::from(age.unsigned_abs()) * 1000).to_le_bytes());
        self.records.extend_from_slice(&(age as f32 / 2.0).to_le_bytes());
        self.records.extend_from_slice(&(age as f64 * 1.5).to_le_bytes());
        self.count += 1;
        self
    }

    fn profile_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.width.records_start() as usize];
        buf[5..9].copy_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.records);
        buf
    }

    fn write(&self, dir: &Path, n: usize) {
        let (profile, strings) = segment_paths(dir, n);
        fs::write(profile, self.profile_bytes()).unwrap();
        fs::write(strings, &self.strings).unwrap();
    }
}

fn ids(scan: &ProfileScan) -> Vec<&str> {
    scan.documents.iter().map(|d| d.id().unwrap()).collect()
}

#[test]
fn test_decodes_all_scalar_types_narrow() {
    let dir = TempDir::new().unwrap();
    SegmentBuilder::new(IdWidth::Narrow)
        .record("a", 10)
        .record("bb", -4)
        .write(dir.path(), 0);

    let schema = schema();
    let scan = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap();

    assert_eq!(scan.segments, 1);
    assert_eq!(ids(&scan), vec!["a", "bb"]);
    let doc = &scan.documents[1];
    assert_eq!(doc.get("age"), Some(&FieldValue::Int32(-4)));
    assert_eq!(doc.get("score"), Some(&FieldValue::Float32(-2.0)));
    assert_eq!(doc.get("weight"), Some(&FieldValue::Float64(-6.0)));
    assert_eq!(
        scan.documents[0].get("ts"),
        Some(&FieldValue::UInt64(10_000))
    );
}

#[test]
fn test_decodes_wide_string_references() {
    let dir = TempDir::new().unwrap();
    SegmentBuilder::new(IdWidth::Wide)
        .record("first", 1)
        .record("second", 2)
        .record("third", 3)
        .write(dir.path(), 0);

    let schema = schema();
    let scan = ProfileReader::new(&schema, IdWidth::Wide)
        .read(dir.path())
        .unwrap();

    assert_eq!(ids(&scan), vec!["first", "second", "third"]);
    assert_eq!(scan.documents[2].get("age"), Some(&FieldValue::Int32(3)));
}

#[test]
fn test_reads_segments_until_gap_and_tracks_duplicates() {
    let dir = TempDir::new().unwrap();
    SegmentBuilder::new(IdWidth::Narrow)
        .record("x", 1)
        .record("y", 2)
        .write(dir.path(), 0);
    SegmentBuilder::new(IdWidth::Narrow)
        .record("x", 3)
        .record("z", 4)
        .write(dir.path(), 1);
    // Segment 3 is unreachable because segment 2 is absent.
    SegmentBuilder::new(IdWidth::Narrow)
        .record("w", 5)
        .write(dir.path(), 3);

    let schema = schema();
    let scan = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap();

    assert_eq!(scan.segments, 2);
    assert_eq!(ids(&scan), vec!["x", "y", "x", "z"]);
    assert!(scan.deletion.is_superseded(0));
    assert!(!scan.deletion.is_superseded(2));
    assert_eq!(scan.deletion.latest("x"), Some(2));
}

#[test]
fn test_empty_segment_is_valid() {
    let dir = TempDir::new().unwrap();
    SegmentBuilder::new(IdWidth::Narrow).write(dir.path(), 0);

    let schema = schema();
    let scan = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap();
    assert!(scan.documents.is_empty());
}

#[test]
fn test_missing_first_segment() {
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::MissingFile(p) if p.ends_with("0.profile")));
}

#[test]
fn test_missing_string_store() {
    let dir = TempDir::new().unwrap();
    let builder = SegmentBuilder::new(IdWidth::Narrow).record("a", 1);
    let (profile, _) = segment_paths(dir.path(), 0);
    fs::write(profile, builder.profile_bytes()).unwrap();

    let schema = schema();
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::MissingFile(p) if p.ends_with("0.str.profile")));
}

#[test]
fn test_short_preamble_is_format_error() {
    let dir = TempDir::new().unwrap();
    let (profile, strings) = segment_paths(dir.path(), 0);
    fs::write(profile, [0u8; 3]).unwrap();
    fs::write(strings, b"").unwrap();

    let schema = schema();
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    match err {
        Error::Format { message, .. } => assert!(message.contains("record count")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_truncated_record_reports_record_number() {
    let dir = TempDir::new().unwrap();
    let builder = SegmentBuilder::new(IdWidth::Narrow)
        .record("a", 1)
        .record("b", 2);
    let mut bytes = builder.profile_bytes();
    bytes.truncate(bytes.len() - 3);
    let (profile, strings) = segment_paths(dir.path(), 0);
    fs::write(profile, bytes).unwrap();
    fs::write(strings, &builder.strings).unwrap();

    let schema = schema();
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    match err {
        Error::Format { message, .. } => assert!(message.starts_with("record 1 of 2")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_string_reference_past_store_end() {
    let dir = TempDir::new().unwrap();
    let builder = SegmentBuilder::new(IdWidth::Narrow).record("abcdef", 1);
    let (profile, strings) = segment_paths(dir.path(), 0);
    fs::write(profile, builder.profile_bytes()).unwrap();
    fs::write(strings, b"abc").unwrap();

    let schema = schema();
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
}

#[test]
fn test_schema_without_id_rejected() {
    let dir = TempDir::new().unwrap();
    let mut schema = schema();
    schema.fields.remove(0);
    let err = ProfileReader::new(&schema, IdWidth::Narrow)
        .read(dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
}

#[test]
fn test_id_width_offsets() {
    assert_eq!(IdWidth::Wide.records_start(), 54);
    assert_eq!(IdWidth::Narrow.records_start(), 46);
    assert_eq!(IdWidth::from_wide(true), IdWidth::Wide);
}
