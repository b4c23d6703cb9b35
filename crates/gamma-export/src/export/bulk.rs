//! Bulk wire format batches.
//!
//! A batch body is a sequence of `{"index":{"_id":...}}` action lines, each
//! followed by the document body line, and always ends with a newline.

use crate::document::Document;
use crate::error::Result;

/// A serialized bulk request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkBatch {
    /// Newline-terminated action/body pairs.
    pub body: String,
    /// Number of documents in the body.
    pub documents: usize,
}

/// Accumulates documents and cuts a batch every `threshold` documents.
#[derive(Debug)]
pub struct BulkBatchBuilder {
    threshold: usize,
    body: String,
    documents: usize,
}

impl BulkBatchBuilder {
    /// Creates a builder flushing every `threshold` documents.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            body: String::new(),
            documents: 0,
        }
    }

    /// Appends `doc`; returns a full batch once the threshold is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be rendered.
    pub fn push(&mut self, doc: &Document) -> Result<Option<BulkBatch>> {
        doc.write_bulk_entry(&mut self.body)?;
        self.documents += 1;
        if self.documents == self.threshold {
            return Ok(self.take());
        }
        Ok(None)
    }

    /// Returns the partial remainder, if any.
    #[must_use]
    pub fn finish(mut self) -> Option<BulkBatch> {
        self.take()
    }

    fn take(&mut self) -> Option<BulkBatch> {
        if self.documents == 0 {
            return None;
        }
        let documents = std::mem::take(&mut self.documents);
        Some(BulkBatch {
            body: std::mem::take(&mut self.body),
            documents,
        })
    }
}

/// Splits `documents` into batches exactly as a single batcher would.
///
/// # Errors
///
/// Returns an error if a document cannot be rendered.
pub fn build_batches<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    threshold: usize,
) -> Result<Vec<BulkBatch>> {
    let mut builder = BulkBatchBuilder::new(threshold);
    let mut batches = Vec::new();
    for doc in documents {
        if let Some(batch) = builder.push(doc)? {
            batches.push(batch);
        }
    }
    batches.extend(builder.finish());
    Ok(batches)
}
