//! linkgraph store - scanning, bulk loading and partition driving.
//!
//! This library provides:
//! - The [`SearchBackend`] seam and its HTTP implementation ([`SearchClient`])
//! - A cursor-driven scan reader that always releases its cursor
//! - A buffered bulk sink with size / time flushing and per-record failures
//! - The partition driver that wires reader, extractor and sink together

pub mod backend;
pub mod client;
pub mod documents;
pub mod driver;
pub mod error;
pub mod query;
pub mod reader;
pub mod sink;

pub use backend::{BulkItem, BulkItemResult, BulkResponse, RawHit, ScanPage, SearchBackend};
pub use client::{ClientOptions, SearchClient};
pub use documents::{FromHit, LinkPair};
pub use driver::{
    FailurePolicy, PartitionOutcome, PartitionStatus, PipelineDriver, PipelineSettings, RunSummary,
};
pub use error::{Result, StoreError};
pub use query::{ScanRequest, Selection};
pub use reader::ScanCursor;
pub use sink::{BulkBatch, BulkOperation, BulkSink, SinkConfig, SinkReport, WriteFailure};
