//! Buffered bulk deletion.
//!
//! [`BulkDeleter`] collects ids and submits them to the engine in bulk requests of at most
//! [`BulkConfig::flush_items`] ids. Items the engine fails are reported one by one to the
//! failure callback; the deleter never stops on a failed item.
//!
//! ```ignore
//! let mut failed = Vec::new();
//! let mut deleter = BulkDeleter::new(&engine, "users", BulkConfig::default())
//!     .on_failure(|item| failed.push(item.id.clone()));
//!
//! deleter.add("a").await?;
//! deleter.add("b").await?;
//! deleter.close().await?;
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    engine::IndexEngine,
    envelope::{BulkItem, BulkItemError},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Tuning for bulk requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkConfig {
    /// Number of buffered ids that triggers a flush.
    #[serde(default = "default_flush_items")]
    pub flush_items: usize,
}

fn default_flush_items() -> usize {
    500
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { flush_items: default_flush_items() }
    }
}

/// Counters accumulated by a [`BulkDeleter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkStats {
    /// Number of bulk requests sent.
    pub flushed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Result of [`Repository::delete_batch`](crate::repository::Repository::delete_batch).
///
/// Per-item failures only show up in `failed_ids`. `error` holds the first error that affected
/// the batch as a whole.
#[derive(Debug, Default)]
pub struct BatchDelete {
    pub failed_ids: Vec<String>,
    pub error: Option<DocumentStoreError>,
}

impl BatchDelete {
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty() && self.error.is_none()
    }
}

type FailureCallback<'a> = Box<dyn FnMut(&BulkItem) + Send + 'a>;

pub struct BulkDeleter<'a, E: IndexEngine> {
    engine: &'a E,
    index: String,
    config: BulkConfig,
    pending: Vec<String>,
    on_failure: Option<FailureCallback<'a>>,
    stats: BulkStats,
}

impl<'a, E: IndexEngine> BulkDeleter<'a, E> {
    pub fn new(engine: &'a E, index: impl Into<String>, config: BulkConfig) -> Self {
        Self {
            engine,
            index: index.into(),
            config,
            pending: Vec::new(),
            on_failure: None,
            stats: BulkStats::default(),
        }
    }

    /// Registers the callback invoked for every item the engine fails.
    pub fn on_failure(mut self, callback: impl FnMut(&BulkItem) + Send + 'a) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn stats(&self) -> BulkStats {
        self.stats
    }

    /// Buffers an id, flushing when the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns the error of the triggered flush, if any. The ids of that flush have already been
    /// reported to the failure callback.
    pub async fn add(&mut self, id: impl Into<String>) -> DocumentStoreResult<()> {
        self.pending.push(id.into());

        if self.pending.len() >= self.config.flush_items.max(1) {
            self.flush().await?;
        }

        Ok(())
    }

    /// Sends everything buffered so far as one bulk request.
    pub async fn flush(&mut self) -> DocumentStoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let ids = std::mem::take(&mut self.pending);
        let count = ids.len();
        self.stats.flushed += 1;

        let response = match self.engine.bulk_delete(&self.index, ids.clone()).await {
            Ok(response) => response,
            Err(error) => {
                warn!(index = %self.index, count, %error, "bulk delete request failed");

                for id in ids {
                    self.report(&BulkItem {
                        id,
                        status: 0,
                        result: None,
                        error: Some(BulkItemError {
                            kind: "request_failed".to_string(),
                            reason: error.to_string(),
                        }),
                    });
                }

                return Err(error);
            }
        };

        debug!(index = %self.index, count, errors = response.errors, "bulk delete flushed");

        for item in &response.items {
            if item.is_failure() {
                self.report(item);
            } else {
                self.stats.succeeded += 1;
            }
        }

        Ok(())
    }

    /// Flushes the remaining ids and releases the deleter.
    pub async fn close(mut self) -> DocumentStoreResult<BulkStats> {
        self.flush().await?;

        Ok(self.stats)
    }

    fn report(&mut self, item: &BulkItem) {
        self.stats.failed += 1;

        debug!(index = %self.index, id = %item.id, status = item.status, "bulk delete item failed");

        if let Some(callback) = self.on_failure.as_mut() {
            callback(item);
        }
    }
}
