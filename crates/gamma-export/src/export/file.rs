//! Line-delimited JSON file sink.

use std::path::PathBuf;

use async_trait::async_trait;
use indicatif::ProgressBar;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{DocumentSink, EligibleDocuments, ExportStats};
use crate::error::Result;

/// Writes one JSON object per line, `_id` included, in record order.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Creates a sink writing to `path`; an existing file is truncated.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    fn sink_type(&self) -> &'static str {
        "file"
    }

    async fn drain(
        &self,
        documents: &mut EligibleDocuments<'_>,
        progress: &ProgressBar,
    ) -> Result<ExportStats> {
        let mut writer = BufWriter::new(File::create(&self.path).await?);
        let mut stats = ExportStats::default();

        for (_, doc) in documents.by_ref() {
            let mut line = doc.to_json_line()?;
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            stats.documents += 1;
            progress.inc(1);
        }
        writer.flush().await?;

        stats.exported = stats.documents;
        stats.batches = 1;
        Ok(stats)
    }
}
