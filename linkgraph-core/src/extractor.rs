//! Expansion of source documents into edge records.
//!
//! The extractor is a pure streaming transform: it holds one document at a
//! time and emits its edges in reference-list order. Malformed identifiers or
//! timestamps are returned as errors; nothing is skipped silently.

use tracing::info;

use crate::error::Result;
use crate::identifier::canonicalize;
use crate::timestamp::seen_at;
use crate::types::{EdgeRecord, SourceDocument};

/// Interval, in documents and in references, between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Document-to-edge transform with progress counters.
#[derive(Debug, Default)]
pub struct EdgeExtractor {
    documents: u64,
    references: u64,
}

impl EdgeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents consumed so far.
    pub fn documents(&self) -> u64 {
        self.documents
    }

    /// Number of edges emitted so far.
    pub fn references(&self) -> u64 {
        self.references
    }

    /// Expand one document into its edges.
    ///
    /// A document without references yields an empty vector, even if its own
    /// identifier would not parse.
    pub fn extract(&mut self, document: &SourceDocument) -> Result<Vec<EdgeRecord>> {
        let references = document.references();
        let mut edges = Vec::with_capacity(references.len());

        if !references.is_empty() {
            let to = canonicalize(&document.id)?;
            let seen = seen_at(&document.fields)?;

            for reference in references {
                edges.push(EdgeRecord {
                    from: canonicalize(&reference.parent_identifier)?,
                    to: to.clone(),
                    name: reference.name.clone(),
                    seen_at: seen.clone(),
                });

                self.references += 1;
                if self.references % PROGRESS_INTERVAL == 0 {
                    info!("{} references processed", self.references);
                }
            }
        }

        self.documents += 1;
        if self.documents % PROGRESS_INTERVAL == 0 {
            info!("{} documents processed", self.documents);
        }

        Ok(edges)
    }

    /// Lazily expand a sequence of documents, stopping at the first error.
    pub fn extract_all<'a, I>(&'a mut self, documents: I) -> impl Iterator<Item = Result<EdgeRecord>> + 'a
    where
        I: IntoIterator<Item = SourceDocument>,
        I::IntoIter: 'a,
    {
        let mut failed = false;
        documents
            .into_iter()
            .map_while(move |document| {
                if failed {
                    return None;
                }
                let result = self.extract(&document);
                failed = result.is_err();
                Some(result)
            })
            .flat_map(|result| match result {
                Ok(edges) => edges.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
    }
}
