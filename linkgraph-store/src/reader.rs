//! Cursor-driven scan reader.
//!
//! A [`ScanCursor`] owns one server-side cursor for the lifetime of one scan.
//! Pages are fetched until the store returns an empty page, at which point
//! the cursor is released. On a fetch or decode error the cursor is released
//! before the error is returned, and a cursor dropped mid-scan is released in
//! the background. A failed release is logged and never changes the scan's
//! outcome; the server expires abandoned cursors after their keep-alive.

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{ScanPage, SearchBackend};
use crate::documents::FromHit;
use crate::error::{Result, StoreError};
use crate::query::ScanRequest;

/// A single-pass, non-restartable scan.
pub struct ScanCursor<T> {
    backend: Arc<dyn SearchBackend>,
    cursor: Option<String>,
    keep_alive: String,
    total: Option<u64>,
    first_page: Option<Vec<T>>,
    exhausted: bool,
    pages: usize,
}

impl<T: FromHit> ScanCursor<T> {
    /// Issue the opening request and capture the cursor and total match count.
    pub async fn open(backend: Arc<dyn SearchBackend>, request: &ScanRequest) -> Result<Self> {
        let page = backend.open_scan(request).await?;
        let total = page.total();
        if let Some(total) = total {
            info!("Query returned {} results.", total);
        }

        let mut scan = Self {
            backend,
            cursor: None,
            keep_alive: request.keep_alive.clone(),
            total,
            first_page: None,
            exhausted: false,
            pages: 0,
        };

        match scan.accept(page) {
            Ok(Some(docs)) => scan.first_page = Some(docs),
            Ok(None) => scan.finish().await,
            Err(e) => {
                scan.finish().await;
                return Err(e);
            }
        }
        Ok(scan)
    }

    /// Total number of matching documents reported by the store, if any.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of non-empty pages handed out so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Return the next page of documents, or `None` once the scan is done.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if let Some(docs) = self.first_page.take() {
            self.pages += 1;
            return Ok(Some(docs));
        }
        if self.exhausted {
            return Ok(None);
        }

        let fetched = match self.cursor.as_deref() {
            Some(cursor) => self.backend.next_page(cursor, &self.keep_alive).await,
            None => Err(StoreError::MissingCursor),
        };

        match fetched.and_then(|page| self.accept(page)) {
            Ok(Some(docs)) => {
                self.pages += 1;
                debug!("Fetched page {} ({} documents)", self.pages, docs.len());
                Ok(Some(docs))
            }
            Ok(None) => {
                self.finish().await;
                Ok(None)
            }
            Err(e) => {
                self.finish().await;
                Err(e)
            }
        }
    }

    /// Track the page's cursor and decode its hits; `None` for an empty page.
    fn accept(&mut self, page: ScanPage) -> Result<Option<Vec<T>>> {
        if let Some(cursor) = page.cursor {
            self.cursor = Some(cursor);
        }
        if page.hits.hits.is_empty() {
            return Ok(None);
        }
        page.hits
            .hits
            .into_iter()
            .map(T::from_hit)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Mark the scan finished and release the cursor.
    async fn finish(&mut self) {
        self.exhausted = true;
        self.first_page = None;
        if let Some(cursor) = self.cursor.take() {
            if let Err(e) = self.backend.release(&cursor).await {
                warn!("Failed to release scan cursor: {}", e);
            } else {
                debug!("Released scan cursor after {} pages", self.pages);
            }
        }
    }

    /// Release the cursor without reading further.
    pub async fn close(mut self) {
        self.finish().await;
    }
}

impl<T: FromHit + Send + 'static> ScanCursor<T> {
    /// Flatten the scan into a lazy document stream.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        stream::unfold(Some((self, VecDeque::new())), |state| async move {
            let (mut scan, mut buffer) = state?;
            loop {
                if let Some(doc) = buffer.pop_front() {
                    return Some((Ok(doc), Some((scan, buffer))));
                }
                match scan.next_page().await {
                    Ok(Some(page)) => buffer.extend(page),
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
    }
}

impl<T> Drop for ScanCursor<T> {
    fn drop(&mut self) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let backend = Arc::clone(&self.backend);
                handle.spawn(async move {
                    if let Err(e) = backend.release(&cursor).await {
                        warn!("Failed to release abandoned scan cursor: {}", e);
                    }
                });
            }
            Err(_) => warn!("Abandoning scan cursor outside a runtime; it will expire server-side"),
        }
    }
}
