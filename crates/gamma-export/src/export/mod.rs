//! Export of decoded documents to a sink.
//!
//! Both sinks see the same document stream: record order, superseded records
//! skipped, and nothing after the first document missing its primary vector.

pub mod bulk;
pub mod file;
pub mod remote;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::deletion::DeletionIndex;
use crate::document::Document;
use crate::error::Result;

pub use bulk::{BulkBatch, BulkBatchBuilder};
pub use file::FileSink;
pub use remote::{BulkSink, DocumentPostSink, PipelineOptions};

/// Export statistics.
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    /// Eligible documents handed to the sink.
    pub documents: u64,
    /// Records skipped because a later record re-wrote their id.
    pub superseded: u64,
    /// Requests or batches delivered.
    pub batches: u64,
    /// Requests or batches that failed.
    pub failed_batches: u64,
    /// Documents delivered.
    pub exported: u64,
    /// Documents in failed requests.
    pub failed: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl ExportStats {
    /// Calculate throughput (documents per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.exported as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Iterator over export-eligible documents with their record index.
pub struct EligibleDocuments<'a> {
    documents: std::slice::Iter<'a, Document>,
    deletion: &'a DeletionIndex,
    primary: Option<&'a str>,
    next_index: u64,
    superseded: u64,
    stopped: bool,
}

impl<'a> EligibleDocuments<'a> {
    /// Filters `documents` through `deletion`; `primary` names the vector
    /// field whose absence ends the stream.
    #[must_use]
    pub fn new(documents: &'a [Document], deletion: &'a DeletionIndex, primary: Option<&'a str>) -> Self {
        Self {
            documents: documents.iter(),
            deletion,
            primary,
            next_index: 0,
            superseded: 0,
            stopped: false,
        }
    }

    /// Superseded records skipped so far.
    #[must_use]
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

impl<'a> Iterator for EligibleDocuments<'a> {
    type Item = (u64, &'a Document);

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        for doc in self.documents.by_ref() {
            let index = self.next_index;
            self.next_index += 1;

            if let Some(primary) = self.primary {
                if !doc.has_vector(primary) {
                    info!("Document {index} has no {primary} vector, ending export");
                    self.stopped = true;
                    return None;
                }
            }
            if self.deletion.is_superseded(index) {
                self.superseded += 1;
                continue;
            }
            return Some((index, doc));
        }
        None
    }
}

/// Destination for eligible documents.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Short sink name for logs.
    fn sink_type(&self) -> &'static str;

    /// Drains `documents` into the sink.
    ///
    /// Implementations fill every counter except `superseded` and
    /// `duration_secs`.
    async fn drain(
        &self,
        documents: &mut EligibleDocuments<'_>,
        progress: &ProgressBar,
    ) -> Result<ExportStats>;
}

/// Exports the eligible subset of `documents` to `sink`.
///
/// # Errors
///
/// Returns an error if the sink fails fatally. Individual failed uploads are
/// counted in the returned stats instead.
pub async fn export(
    documents: &[Document],
    deletion: &DeletionIndex,
    primary: Option<&str>,
    sink: &dyn DocumentSink,
) -> Result<ExportStats> {
    let start = std::time::Instant::now();
    info!("Exporting {} documents to {} sink", documents.len(), sink.sink_type());

    let progress = create_progress_bar(documents.len() as u64);
    let mut eligible = EligibleDocuments::new(documents, deletion, primary);
    let mut stats = sink.drain(&mut eligible, &progress).await?;
    progress.finish_with_message("Export complete");

    stats.superseded = eligible.superseded();
    stats.duration_secs = start.elapsed().as_secs_f64();

    info!(
        "Export complete: {} documents, {} exported, {} failed, {} superseded in {:.2}s ({:.0} docs/sec)",
        stats.documents,
        stats.exported,
        stats.failed,
        stats.superseded,
        stats.duration_secs,
        stats.throughput()
    );

    Ok(stats)
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}
