//! Buffered bulk writer.
//!
//! Keyed edges are encoded as NDJSON `index` actions and buffered. The buffer
//! is flushed when its encoded size reaches `flush_bytes`, when
//! `flush_interval` has passed since the last flush, or when the input ends.
//!
//! A record the store rejects is reported and counted; it never aborts the
//! batch or the stream. Records rejected as throttled (HTTP 429) are sent
//! again after `retry_wait`, up to `max_retries` times. A failed bulk request
//! as a whole is returned as an error.

use futures::{Stream, StreamExt};
use linkgraph_core::{EdgeRecord, KeyedEdge};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::backend::{BulkItemResult, SearchBackend};
use crate::error::Result;

/// Default byte threshold: 50 MiB.
pub const DEFAULT_FLUSH_BYTES: usize = 50 * 1024 * 1024;
/// Default time threshold.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(5);

/// Flush and retry policy of a [`BulkSink`].
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Write alias; the store is asked to reject writes if it is not an alias.
    pub alias: String,
    pub flush_bytes: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub retry_wait: Duration,
}

impl SinkConfig {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            flush_bytes: DEFAULT_FLUSH_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_wait: DEFAULT_RETRY_WAIT,
        }
    }

    pub fn with_flush_bytes(mut self, bytes: usize) -> Self {
        self.flush_bytes = bytes;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_wait: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_wait = retry_wait;
        self
    }
}

/// One encoded `index` action plus its document.
#[derive(Debug, Clone)]
pub struct BulkOperation {
    pub key: String,
    pub edge: EdgeRecord,
    encoded: String,
}

impl BulkOperation {
    pub fn index(alias: &str, keyed: KeyedEdge) -> Result<Self> {
        let KeyedEdge { key, edge } = keyed;
        let action = json!({ "index": { "_index": alias, "_id": key } });

        let mut encoded = serde_json::to_string(&action)?;
        encoded.push('\n');
        encoded.push_str(&serde_json::to_string(&edge)?);
        encoded.push('\n');

        Ok(Self { key, edge, encoded })
    }

    /// Size of this operation in the request body, in bytes.
    pub fn encoded_len(&self) -> usize {
        self.encoded.len()
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// A batch of operations submitted in one bulk request.
#[derive(Debug, Clone)]
pub struct BulkBatch {
    pub alias: String,
    pub operations: Vec<BulkOperation>,
}

impl BulkBatch {
    pub fn new(alias: impl Into<String>, operations: Vec<BulkOperation>) -> Self {
        Self {
            alias: alias.into(),
            operations,
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.operations.iter().map(BulkOperation::encoded_len).sum()
    }

    /// Request body, newline-delimited.
    pub fn to_ndjson(&self) -> String {
        let mut body = String::with_capacity(self.bytes());
        for op in &self.operations {
            body.push_str(op.encoded());
        }
        body
    }
}

/// A record the store refused to write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub key: String,
    pub edge: EdgeRecord,
    pub status: u16,
    pub reason: String,
}

/// Aggregate outcome of a sink run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    /// Distinct records submitted.
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Re-submissions of throttled records.
    pub retried: u64,
    /// Flushes performed.
    pub batches: u64,
    /// Encoded bytes flushed, retries excluded.
    pub bytes: u64,
    pub duration_ms: u64,
}

/// Buffered writer for one partition.
pub struct BulkSink {
    backend: Arc<dyn SearchBackend>,
    config: SinkConfig,
    failures: Option<mpsc::UnboundedSender<WriteFailure>>,
    buffer: Vec<BulkOperation>,
    buffered_bytes: usize,
    last_flush: Instant,
    started: Instant,
    report: SinkReport,
}

impl BulkSink {
    pub fn new(backend: Arc<dyn SearchBackend>, config: SinkConfig) -> Self {
        let now = Instant::now();
        Self {
            backend,
            config,
            failures: None,
            buffer: Vec::new(),
            buffered_bytes: 0,
            last_flush: now,
            started: now,
            report: SinkReport::default(),
        }
    }

    /// Also send every rejected record to `tx`.
    pub fn with_failure_channel(mut self, tx: mpsc::UnboundedSender<WriteFailure>) -> Self {
        self.failures = Some(tx);
        self
    }

    pub fn report(&self) -> &SinkReport {
        &self.report
    }

    /// Number of records waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer a record, flushing if the byte threshold is reached.
    pub async fn push(&mut self, keyed: KeyedEdge) -> Result<()> {
        let op = BulkOperation::index(&self.config.alias, keyed)?;
        self.buffered_bytes += op.encoded_len();
        self.buffer.push(op);

        if self.buffered_bytes >= self.config.flush_bytes {
            debug!(
                "Buffer reached {} bytes, flushing {} records",
                self.buffered_bytes,
                self.buffer.len()
            );
            self.flush().await?;
        }
        Ok(())
    }

    /// Write out everything buffered.
    pub async fn flush(&mut self) -> Result<()> {
        self.last_flush = Instant::now();
        if self.buffer.is_empty() {
            return Ok(());
        }

        let operations = std::mem::take(&mut self.buffer);
        let bytes = std::mem::take(&mut self.buffered_bytes);
        self.report.batches += 1;
        self.report.bytes += bytes as u64;
        self.report.attempted += operations.len() as u64;

        let mut pending = BulkBatch::new(self.config.alias.clone(), operations);
        let mut attempt = 0;

        loop {
            let response = self.backend.bulk(&pending).await?;
            let batch_len = pending.len();

            if !response.errors {
                self.report.succeeded += batch_len as u64;
                debug!("Flushed {} records in {} ms", batch_len, response.took);
                break;
            }

            let mut items = response.items.into_iter();
            let mut throttled = Vec::new();
            for op in pending.operations {
                match items.next() {
                    Some(item) => {
                        let result = item.result();
                        if result.is_success() {
                            self.report.succeeded += 1;
                        } else if result.is_throttled() && attempt < self.config.max_retries {
                            throttled.push(op);
                        } else {
                            self.reject(op, result);
                        }
                    }
                    None => self.reject(
                        op,
                        &BulkItemResult {
                            id: None,
                            status: 0,
                            error: Some(json!("missing from bulk response")),
                        },
                    ),
                }
            }

            if throttled.is_empty() {
                break;
            }

            attempt += 1;
            self.report.retried += throttled.len() as u64;
            warn!(
                "{} records throttled, retry {}/{} in {:?}",
                throttled.len(),
                attempt,
                self.config.max_retries,
                self.config.retry_wait
            );
            time::sleep(self.config.retry_wait).await;
            pending = BulkBatch::new(self.config.alias.clone(), throttled);
        }

        Ok(())
    }

    fn reject(&mut self, op: BulkOperation, result: &BulkItemResult) {
        self.report.failed += 1;
        let failure = WriteFailure {
            key: op.key,
            edge: op.edge,
            status: result.status,
            reason: result.reason(),
        };
        warn!(
            "Error indexing {} ({} -> {} '{}'): {}",
            failure.key, failure.edge.from, failure.edge.to, failure.edge.name, failure.reason
        );
        if let Some(tx) = &self.failures {
            let _ = tx.send(failure);
        }
    }

    /// Flush what is left and return the aggregate result.
    pub async fn finish(mut self) -> Result<SinkReport> {
        self.flush().await?;
        Ok(self.into_report())
    }

    /// The counts so far, without flushing the buffer.
    pub fn into_report(mut self) -> SinkReport {
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        self.report
    }

    /// Push every item of `input`, flushing on size and on the interval.
    ///
    /// Stops at the first error item or failed flush; the buffer is left as
    /// is and [`Self::report`] keeps counting what was already flushed.
    pub async fn drain<S>(&mut self, input: S) -> Result<()>
    where
        S: Stream<Item = Result<KeyedEdge>>,
    {
        let mut input = std::pin::pin!(input);

        loop {
            let deadline = self.last_flush + self.config.flush_interval;
            tokio::select! {
                next = input.next() => match next {
                    Some(Ok(keyed)) => self.push(keyed).await?,
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                },
                _ = time::sleep_until(deadline), if !self.buffer.is_empty() => {
                    debug!("Flush interval elapsed with {} records buffered", self.buffer.len());
                    self.flush().await?;
                }
            }
        }
    }

    /// Drain a stream of keyed edges into the store.
    ///
    /// An error item from the stream is returned as-is; records still in the
    /// buffer at that point are not written.
    pub async fn run<S>(mut self, input: S) -> Result<SinkReport>
    where
        S: Stream<Item = Result<KeyedEdge>>,
    {
        self.drain(input).await?;
        self.finish().await
    }
}
