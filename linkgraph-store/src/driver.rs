//! Partition-by-partition pipeline driver.
//!
//! For each partition, in ascending order: open a scan of the source index,
//! expand documents into edges, key them, and drain them into a fresh
//! [`BulkSink`]. Partitions never overlap in time and never run concurrently,
//! so each sink report covers exactly one partition.

use futures::{stream, StreamExt, TryStreamExt};
use linkgraph_core::{EdgeExtractor, KeyAssigner, KeyDigest, Partition, SourceDocument};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::backend::SearchBackend;
use crate::error::{Result, StoreError};
use crate::query::ScanRequest;
use crate::reader::ScanCursor;
use crate::sink::{BulkSink, SinkConfig, SinkReport, WriteFailure};

pub const DEFAULT_SOURCE_INDEX: &str = "ipfs_files";
pub const DEFAULT_DESTINATION_ALIAS: &str = "ipfs_links";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_KEEP_ALIVE: &str = "1m";

/// What to do when a partition fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run at the first failed partition.
    #[default]
    Abort,
    /// Record the failure and move on to the next partition.
    Continue,
}

/// Static parameters of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_index: String,
    pub page_size: usize,
    pub keep_alive: String,
    pub sink: SinkConfig,
    pub digest: KeyDigest,
    pub on_failure: FailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            source_index: DEFAULT_SOURCE_INDEX.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            sink: SinkConfig::new(DEFAULT_DESTINATION_ALIAS),
            digest: KeyDigest::default(),
            on_failure: FailurePolicy::default(),
        }
    }
}

/// Outcome of one partition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
    Completed {
        /// Matching documents reported by the store.
        matched: Option<u64>,
        documents: u64,
        report: SinkReport,
    },
    Failed {
        error: String,
        documents: u64,
        /// What the sink flushed before the failure.
        report: SinkReport,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionOutcome {
    pub partition: String,
    #[serde(flatten)]
    pub status: PartitionStatus,
}

impl PartitionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PartitionStatus::Failed { .. })
    }

    pub fn report(&self) -> &SinkReport {
        match &self.status {
            PartitionStatus::Completed { report, .. } | PartitionStatus::Failed { report, .. } => {
                report
            }
        }
    }
}

/// Per-partition results of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub partitions: Vec<PartitionOutcome>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn failed_partitions(&self) -> usize {
        self.partitions.iter().filter(|p| p.is_failed()).count()
    }

    /// Sum of every partition's sink report, failed partitions included.
    pub fn totals(&self) -> SinkReport {
        let mut total = SinkReport::default();
        for report in self.partitions.iter().map(PartitionOutcome::report) {
            total.attempted += report.attempted;
            total.succeeded += report.succeeded;
            total.failed += report.failed;
            total.retried += report.retried;
            total.batches += report.batches;
            total.bytes += report.bytes;
            total.duration_ms += report.duration_ms;
        }
        total
    }
}

/// A partition that stopped early, with the work it got through.
struct PartitionFailure {
    error: StoreError,
    documents: u64,
    report: SinkReport,
}

/// Wires reader, extractor, key assigner and sink for each partition.
pub struct PipelineDriver {
    source: Arc<dyn SearchBackend>,
    destination: Arc<dyn SearchBackend>,
    settings: PipelineSettings,
    failures: Option<mpsc::UnboundedSender<WriteFailure>>,
}

impl PipelineDriver {
    pub fn new(
        source: Arc<dyn SearchBackend>,
        destination: Arc<dyn SearchBackend>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            destination,
            settings,
            failures: None,
        }
    }

    /// Forward every per-record write failure to `tx`.
    pub fn with_failure_channel(mut self, tx: mpsc::UnboundedSender<WriteFailure>) -> Self {
        self.failures = Some(tx);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every partition in order.
    ///
    /// With [`FailurePolicy::Abort`] the first partition error stops the run
    /// and is returned as [`StoreError::Aborted`], carrying the summary of
    /// every partition attempted so far. With [`FailurePolicy::Continue`]
    /// failures are recorded in the summary and the run goes on.
    pub async fn run(&self, partitions: &[Partition]) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for partition in partitions {
            info!("Processing {}", partition);
            match self.load(partition).await {
                Ok(status) => {
                    if let PartitionStatus::Completed { report, .. } = &status {
                        info!(
                            "Processed {}: {} attempted, {} succeeded, {} failed",
                            partition, report.attempted, report.succeeded, report.failed
                        );
                    }
                    summary.partitions.push(PartitionOutcome {
                        partition: partition.to_string(),
                        status,
                    });
                }
                Err(failure) => {
                    error!("Partition {} failed: {}", partition, failure.error);
                    summary.partitions.push(PartitionOutcome {
                        partition: partition.to_string(),
                        status: PartitionStatus::Failed {
                            error: failure.error.to_string(),
                            documents: failure.documents,
                            report: failure.report,
                        },
                    });
                    if self.settings.on_failure == FailurePolicy::Abort {
                        summary.duration_ms = started.elapsed().as_millis() as u64;
                        return Err(StoreError::Aborted {
                            summary: Box::new(summary),
                            source: Box::new(failure.error.in_partition(partition)),
                        });
                    }
                }
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Scan, extract and load a single partition.
    pub async fn run_partition(&self, partition: &Partition) -> Result<PartitionStatus> {
        self.load(partition).await.map_err(|failure| failure.error)
    }

    async fn load(
        &self,
        partition: &Partition,
    ) -> std::result::Result<PartitionStatus, PartitionFailure> {
        let request = ScanRequest::documents(
            &self.settings.source_index,
            partition,
            self.settings.page_size,
            &self.settings.keep_alive,
        );
        let scan = ScanCursor::<SourceDocument>::open(Arc::clone(&self.source), &request)
            .await
            .map_err(|error| PartitionFailure {
                error,
                documents: 0,
                report: SinkReport::default(),
            })?;
        let matched = scan.total();

        let mut extractor = EdgeExtractor::new();
        let assigner = KeyAssigner::new(self.settings.digest);

        let edges = scan
            .into_stream()
            .map(|doc| -> Result<Vec<_>> {
                let doc = doc?;
                let edges = extractor.extract(&doc)?;
                Ok(edges.into_iter().map(|edge| assigner.assign(edge)).collect())
            })
            .map_ok(|keyed| stream::iter(keyed.into_iter().map(Ok::<_, StoreError>)))
            .try_flatten();

        let mut sink = BulkSink::new(Arc::clone(&self.destination), self.settings.sink.clone());
        if let Some(tx) = &self.failures {
            sink = sink.with_failure_channel(tx.clone());
        }

        let drained = sink.drain(edges).await;
        let loaded = match drained {
            Ok(()) => sink.flush().await,
            Err(e) => Err(e),
        };
        if let Err(error) = loaded {
            return Err(PartitionFailure {
                error,
                documents: extractor.documents(),
                report: sink.into_report(),
            });
        }

        Ok(PartitionStatus::Completed {
            matched,
            documents: extractor.documents(),
            report: sink.into_report(),
        })
    }
}
