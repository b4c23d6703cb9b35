//! Remote sinks: the bulk upload pipeline and the per-document fallback.
//!
//! The bulk pipeline has two stages joined by bounded queues:
//!
//! ```text
//! producer ──docs──▶ batchers (N) ──batches──▶ coordinator ──▶ uploaders (M)
//! ```
//!
//! Each batcher pushes one end marker when its input is exhausted; the
//! coordinator stops reading after N markers and then waits for in-flight
//! uploads. Full queues block their producers, and the coordinator stops
//! pulling batches while all M uploaders are busy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::ProgressBar;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::bulk::{BulkBatch, BulkBatchBuilder};
use super::{DocumentSink, EligibleDocuments, ExportStats};
use crate::config::ExportOptions;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::http::{bulk_url, create_http_client, document_url};

/// Sizing and timeouts of the bulk pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Documents per batch.
    pub batch_size: usize,
    /// Number of batcher workers.
    pub batchers: usize,
    /// Maximum concurrent uploads.
    pub uploaders: usize,
    /// Document queue capacity.
    pub document_queue_capacity: usize,
    /// Batch queue capacity.
    pub batch_queue_capacity: usize,
    /// Longest wait on an empty queue before the run fails.
    pub queue_timeout: Duration,
}

impl PipelineOptions {
    /// Rejects sizes the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first zero option.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("batchers", self.batchers),
            ("uploaders", self.uploaders),
            ("document_queue_capacity", self.document_queue_capacity),
            ("batch_queue_capacity", self.batch_queue_capacity),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.queue_timeout.is_zero() {
            return Err(Error::Config(
                "queue timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&ExportOptions::default())
    }
}

impl From<&ExportOptions> for PipelineOptions {
    fn from(options: &ExportOptions) -> Self {
        Self {
            batch_size: options.batch_size,
            batchers: options.batchers,
            uploaders: options.uploaders,
            document_queue_capacity: options.document_queue_capacity,
            batch_queue_capacity: options.batch_queue_capacity,
            queue_timeout: Duration::from_secs(options.queue_timeout_secs),
        }
    }
}

/// Message on the batch queue.
#[derive(Debug)]
pub(crate) enum BatchMessage {
    /// A serialized batch ready for upload.
    Batch(BulkBatch),
    /// Batcher `worker` has exhausted its input.
    Done { worker: usize },
}

/// Sends serialized batches to a bulk endpoint.
#[derive(Debug, Clone)]
pub(crate) struct BulkUploader {
    client: Client,
    url: String,
}

impl BulkUploader {
    pub(crate) fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }

    async fn upload(&self, body: String) -> Result<()> {
        post(&self.client, &self.url, "application/x-ndjson", body).await
    }
}

async fn post(client: &Client, url: &str, content_type: &str, body: String) -> Result<()> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|e| Error::Upload {
            status: 0,
            body: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(Error::Upload {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

/// Per-batch outcome counts collected by the coordinator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct UploadTally {
    pub(crate) batches: u64,
    pub(crate) failed_batches: u64,
    pub(crate) documents: u64,
    pub(crate) failed_documents: u64,
    pub(crate) end_markers: usize,
}

impl UploadTally {
    fn record(&mut self, documents: usize, result: Result<()>) {
        match result {
            Ok(()) => {
                self.batches += 1;
                self.documents += documents as u64;
            }
            Err(e) => {
                warn!("response failed, [{}]", e);
                self.failed_batches += 1;
                self.failed_documents += documents as u64;
            }
        }
    }
}

/// Bulk-loads documents through the batcher/uploader pipeline.
pub struct BulkSink {
    uploader: BulkUploader,
    options: PipelineOptions,
}

impl BulkSink {
    /// Creates a sink posting to `<base_url>/_bulk`.
    #[must_use]
    pub fn new(base_url: &str, options: PipelineOptions, request_timeout: Duration) -> Self {
        Self {
            uploader: BulkUploader::new(create_http_client(request_timeout), bulk_url(base_url)),
            options,
        }
    }
}

#[async_trait]
impl DocumentSink for BulkSink {
    fn sink_type(&self) -> &'static str {
        "bulk"
    }

    async fn drain(
        &self,
        documents: &mut EligibleDocuments<'_>,
        progress: &ProgressBar,
    ) -> Result<ExportStats> {
        let opts = &self.options;
        opts.validate()?;
        let (doc_tx, doc_rx) = mpsc::channel::<Option<Document>>(opts.document_queue_capacity);
        let (batch_tx, batch_rx) = mpsc::channel::<BatchMessage>(opts.batch_queue_capacity);
        let doc_rx = Arc::new(Mutex::new(doc_rx));

        let coordinator = tokio::spawn(coordinate(
            batch_rx,
            self.uploader.clone(),
            opts.batchers,
            opts.uploaders,
            opts.queue_timeout,
        ));

        let batchers: Vec<_> = (0..opts.batchers)
            .map(|worker| {
                tokio::spawn(run_batcher(
                    worker,
                    Arc::clone(&doc_rx),
                    batch_tx.clone(),
                    opts.batch_size,
                    opts.queue_timeout,
                ))
            })
            .collect();
        drop(batch_tx);
        drop(doc_rx);

        let mut stats = ExportStats::default();
        let mut queue_closed = false;
        for (_, doc) in documents.by_ref() {
            if doc_tx.send(Some(doc.clone())).await.is_err() {
                queue_closed = true;
                break;
            }
            stats.documents += 1;
            progress.inc(1);
        }
        if !queue_closed {
            for _ in 0..opts.batchers {
                if doc_tx.send(None).await.is_err() {
                    break;
                }
            }
        }
        drop(doc_tx);

        let mut batched = 0;
        for handle in futures::future::join_all(batchers).await {
            let report = handle.map_err(|e| Error::Pipeline(format!("batcher panicked: {e}")))??;
            batched += report.documents;
        }
        let tally = coordinator
            .await
            .map_err(|e| Error::Pipeline(format!("coordinator panicked: {e}")))??;

        if queue_closed || batched != stats.documents {
            return Err(Error::Pipeline(format!(
                "{} documents queued but {} batched",
                stats.documents, batched
            )));
        }

        info!("all dump process has finished! {}", tally.end_markers);
        stats.batches = tally.batches;
        stats.failed_batches = tally.failed_batches;
        stats.exported = tally.documents;
        stats.failed = tally.failed_documents;
        Ok(stats)
    }
}

#[derive(Debug, Default)]
pub(crate) struct BatcherReport {
    pub(crate) documents: u64,
    pub(crate) batches: u64,
}

/// Stage 1: drains the shared document queue into bulk batches.
pub(crate) async fn run_batcher(
    worker: usize,
    documents: Arc<Mutex<mpsc::Receiver<Option<Document>>>>,
    batches: mpsc::Sender<BatchMessage>,
    batch_size: usize,
    queue_timeout: Duration,
) -> Result<BatcherReport> {
    let mut builder = BulkBatchBuilder::new(batch_size);
    let mut report = BatcherReport::default();
    let closed = || Error::Pipeline("batch queue closed".to_string());

    loop {
        let next = tokio::time::timeout(queue_timeout, async {
            documents.lock().await.recv().await
        })
        .await
        .map_err(|_| Error::QueueTimeout(queue_timeout.as_secs(), "document queue"))?;

        let Some(Some(doc)) = next else {
            break;
        };
        report.documents += 1;
        if let Some(batch) = builder.push(&doc)? {
            batches
                .send(BatchMessage::Batch(batch))
                .await
                .map_err(|_| closed())?;
            report.batches += 1;
        }
    }

    if let Some(batch) = builder.finish() {
        batches
            .send(BatchMessage::Batch(batch))
            .await
            .map_err(|_| closed())?;
        report.batches += 1;
    }
    batches
        .send(BatchMessage::Done { worker })
        .await
        .map_err(|_| closed())?;

    debug!(
        "batcher {} dump num: {} in {} batches",
        worker, report.documents, report.batches
    );
    Ok(report)
}

/// Stage 2: dispatches batches to at most `uploaders` concurrent requests
/// until every batcher has reported its end marker.
pub(crate) async fn coordinate(
    mut batches: mpsc::Receiver<BatchMessage>,
    uploader: BulkUploader,
    batchers: usize,
    uploaders: usize,
    queue_timeout: Duration,
) -> Result<UploadTally> {
    let permits = Arc::new(Semaphore::new(uploaders));
    let mut inflight = JoinSet::new();
    let mut tally = UploadTally::default();

    while tally.end_markers < batchers {
        let message = tokio::time::timeout(queue_timeout, batches.recv())
            .await
            .map_err(|_| Error::QueueTimeout(queue_timeout.as_secs(), "batch queue"))?;

        match message {
            Some(BatchMessage::Batch(batch)) => {
                let permit = Arc::clone(&permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Pipeline("uploader pool closed".to_string()))?;
                let uploader = uploader.clone();
                inflight.spawn(async move {
                    let result = uploader.upload(batch.body).await;
                    drop(permit);
                    (batch.documents, result)
                });
            }
            Some(BatchMessage::Done { worker }) => {
                tally.end_markers += 1;
                debug!(
                    "batcher {} finished ({}/{})",
                    worker, tally.end_markers, batchers
                );
            }
            None => {
                return Err(Error::Pipeline(format!(
                    "batch queue closed after {} of {} batchers finished",
                    tally.end_markers, batchers
                )));
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        let (documents, result) =
            joined.map_err(|e| Error::Pipeline(format!("uploader panicked: {e}")))?;
        tally.record(documents, result);
    }

    Ok(tally)
}

/// Sends each document as its own request to `<url>/<id>`, sequentially.
pub struct DocumentPostSink {
    client: Client,
    base_url: String,
}

impl DocumentPostSink {
    /// Creates a sink posting under `base_url`.
    #[must_use]
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        Self {
            client: create_http_client(request_timeout),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl DocumentSink for DocumentPostSink {
    fn sink_type(&self) -> &'static str {
        "document"
    }

    async fn drain(
        &self,
        documents: &mut EligibleDocuments<'_>,
        progress: &ProgressBar,
    ) -> Result<ExportStats> {
        let mut stats = ExportStats::default();

        for (index, doc) in documents.by_ref() {
            stats.documents += 1;
            let id = doc
                .id()
                .ok_or_else(|| Error::Pipeline(format!("record {index} has no _id")))?;
            let url = document_url(&self.base_url, id);
            match post(&self.client, &url, "application/json", doc.body_json()?).await {
                Ok(()) => {
                    stats.batches += 1;
                    stats.exported += 1;
                }
                Err(e) => {
                    warn!("response failed, [{}]", e);
                    stats.failed_batches += 1;
                    stats.failed += 1;
                }
            }
            progress.inc(1);
        }

        Ok(stats)
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
