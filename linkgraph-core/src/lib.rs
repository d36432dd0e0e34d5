//! linkgraph core - pure transformation logic for rebuilding the content
//! reference graph.
//!
//! This crate has no I/O. It turns scanned documents into keyed edge records
//! and plans the time partitions a load is split into:
//!
//! - **types**: scanned documents, references and edge records
//! - **identifier**: content identifier canonicalization (CIDv1, base32)
//! - **timestamp**: whole-second UTC observation times
//! - **extractor**: one edge per reference, in scan order
//! - **identity**: deterministic edge keys for idempotent upserts
//! - **partition**: year / month windows and year-list parsing
//!
//! # Example
//!
//! ```
//! use linkgraph_core::{EdgeExtractor, KeyAssigner, Reference, SourceDocument};
//!
//! let doc = SourceDocument::new("QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n")
//!     .with_first_seen("2020-01-01T00:00:00.000Z")
//!     .with_references(vec![Reference::new(
//!         "QmY7Yh4UquoXHLPFo2XbhXkhBvFoPwmQUSa92pxnxjQuPU",
//!         "readme",
//!     )]);
//!
//! let mut extractor = EdgeExtractor::new();
//! let assigner = KeyAssigner::default();
//! let keyed: Vec<_> = extractor
//!     .extract(&doc)
//!     .unwrap()
//!     .into_iter()
//!     .map(|edge| assigner.assign(edge))
//!     .collect();
//!
//! assert_eq!(keyed.len(), 1);
//! assert_eq!(keyed[0].edge.seen_at.as_deref(), Some("2020-01-01T00:00:00Z"));
//! ```

pub mod error;
pub mod extractor;
pub mod identifier;
pub mod identity;
pub mod partition;
pub mod timestamp;
pub mod types;

pub use error::{CoreError, Result};
pub use extractor::EdgeExtractor;
pub use identity::{KeyAssigner, KeyDigest};
pub use partition::Partition;
pub use types::{EdgeRecord, KeyedEdge, Reference, SourceDocument, SourceFields};
