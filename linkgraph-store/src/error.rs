//! Error types for linkgraph-store.

use linkgraph_core::CoreError;
use thiserror::Error;

use crate::driver::RunSummary;

/// Result type alias for linkgraph-store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while scanning, loading or driving partitions.
///
/// Per-record write rejections are not errors: they are counted in
/// [`SinkReport`](crate::sink::SinkReport) and reported as
/// [`WriteFailure`](crate::sink::WriteFailure)s.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or the connection broke.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Store returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// A request could not be encoded or a response did not have the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A scanned hit could not be decoded into a document.
    #[error("Malformed document '{id}': {source}")]
    MalformedDocument {
        /// Identifier of the offending hit.
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A document held data that failed normalization.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A scan response carried no cursor although more pages were expected.
    #[error("Scan response carried no cursor")]
    MissingCursor,

    /// A partition could not be completed.
    #[error("Partition {partition} failed: {source}")]
    Partition {
        /// Partition label, e.g. `2021` or `2021-12`.
        partition: String,
        #[source]
        source: Box<StoreError>,
    },

    /// The run stopped at a failed partition.
    #[error("Run aborted: {source}")]
    Aborted {
        /// Every partition attempted so far, the failed one last.
        summary: Box<RunSummary>,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Wrap an error with the label of the partition it aborted.
    pub fn in_partition(self, partition: impl ToString) -> Self {
        StoreError::Partition {
            partition: partition.to_string(),
            source: Box::new(self),
        }
    }
}
