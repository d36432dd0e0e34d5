//! In-memory search backend for integration tests.
//!
//! Holds a corpus of source hits (filtered by the scan's first-seen window),
//! pages it through numbered cursors, and emulates the destination alias as a
//! key -> edge map so repeated loads can be checked for idempotency.

#![allow(dead_code)]

use async_trait::async_trait;
use linkgraph_core::EdgeRecord;
use linkgraph_store::backend::{BulkItem, BulkItemResult, BulkResponse, Hits, HitTotal};
use linkgraph_store::{
    BulkBatch, RawHit, Result, ScanPage, ScanRequest, SearchBackend, Selection, StoreError,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const CHILD_A: &str = "QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n";
pub const CHILD_B: &str = "QmY7Yh4UquoXHLPFo2XbhXkhBvFoPwmQUSa92pxnxjQuPU";
pub const PARENT: &str = "QmbWqxBEKC3P8tqsKc98xmWNzrzDtRLMiMPL8wBuTGsMnR";

#[derive(Default)]
struct State {
    corpus: Vec<RawHit>,
    cursors: HashMap<String, (usize, VecDeque<RawHit>)>,
    next_cursor: usize,
    opened: Vec<ScanRequest>,
    released: Vec<String>,
    pages_served: usize,
    fail_page: Option<usize>,
    written: BTreeMap<String, EdgeRecord>,
    batches: Vec<Vec<String>>,
    rejections: HashMap<String, (u16, usize)>,
    bulk_down: bool,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_corpus(hits: Vec<RawHit>) -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().corpus = hits;
        backend
    }

    pub fn as_backend(&self) -> Arc<dyn SearchBackend> {
        Arc::new(self.clone())
    }

    /// Fail the `n`-th follow-up page request (1-based) with HTTP 503.
    pub fn fail_page(&self, n: usize) {
        self.state.lock().unwrap().fail_page = Some(n);
    }

    /// Reject writes of `key` with `status`, `times` times.
    pub fn reject(&self, key: &str, status: u16, times: usize) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(key.to_string(), (status, times));
    }

    pub fn set_bulk_down(&self, down: bool) {
        self.state.lock().unwrap().bulk_down = down;
    }

    pub fn opened(&self) -> Vec<ScanRequest> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn open_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }

    pub fn written(&self) -> BTreeMap<String, EdgeRecord> {
        self.state.lock().unwrap().written.clone()
    }

    /// Keys submitted per bulk request, in order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().batches.clone()
    }
}

/// A source hit with references and timestamps.
pub fn source_hit(id: &str, first_seen: &str, refs: &[(&str, &str)]) -> RawHit {
    let references: Vec<Value> = refs
        .iter()
        .map(|(parent, name)| json!({"parent_hash": parent, "name": name}))
        .collect();
    RawHit {
        id: id.to_string(),
        source: json!({"references": references, "first-seen": first_seen}),
    }
}

/// A source hit without a references field.
pub fn bare_hit(id: &str, first_seen: &str) -> RawHit {
    RawHit {
        id: id.to_string(),
        source: json!({"first-seen": first_seen}),
    }
}

fn selects(selection: &Selection, hit: &RawHit) -> bool {
    match selection {
        Selection::All => true,
        Selection::Window {
            field,
            gte,
            lt,
            required,
            ..
        } => {
            if hit.source.get(required).is_none() {
                return false;
            }
            let Some(value) = hit.source.get(field).and_then(Value::as_str) else {
                return false;
            };
            // Bounds are rendered at partition granularity (yyyy or yyyy-MM).
            let prefix = &value[..gte.len().min(value.len())];
            prefix >= gte.as_str() && prefix < lt.as_str()
        }
    }
}

impl State {
    fn page(&mut self, cursor: &str) -> ScanPage {
        let (size, remaining) = self.cursors.get_mut(cursor).expect("unknown cursor");
        let take = (*size).min(remaining.len());
        let hits: Vec<RawHit> = remaining.drain(..take).collect();
        ScanPage {
            cursor: Some(cursor.to_string()),
            hits: Hits {
                total: None,
                hits,
            },
        }
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn open_scan(&self, request: &ScanRequest) -> Result<ScanPage> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(request.clone());

        let matching: VecDeque<RawHit> = if request.selection == Selection::All {
            state
                .written
                .iter()
                .map(|(key, edge)| RawHit {
                    id: key.clone(),
                    source: json!({"from": edge.from, "to": edge.to}),
                })
                .collect()
        } else {
            state
                .corpus
                .iter()
                .filter(|hit| selects(&request.selection, hit))
                .cloned()
                .collect()
        };

        let total = matching.len() as u64;
        state.next_cursor += 1;
        let cursor = format!("cursor-{}", state.next_cursor);
        state
            .cursors
            .insert(cursor.clone(), (request.page_size, matching));

        let mut page = state.page(&cursor);
        page.hits.total = Some(HitTotal::Tracked { value: total });
        Ok(page)
    }

    async fn next_page(&self, cursor: &str, _keep_alive: &str) -> Result<ScanPage> {
        let mut state = self.state.lock().unwrap();
        state.pages_served += 1;
        if state.fail_page == Some(state.pages_served) {
            return Err(StoreError::Api {
                status: 503,
                body: "search_phase_execution_exception".to_string(),
            });
        }
        Ok(state.page(cursor))
    }

    async fn release(&self, cursor: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cursors.remove(cursor);
        state.released.push(cursor.to_string());
        Ok(())
    }

    async fn bulk(&self, batch: &BulkBatch) -> Result<BulkResponse> {
        let mut state = self.state.lock().unwrap();
        if state.bulk_down {
            return Err(StoreError::Api {
                status: 503,
                body: "cluster unavailable".to_string(),
            });
        }

        state
            .batches
            .push(batch.operations.iter().map(|op| op.key.clone()).collect());

        let mut errors = false;
        let mut items = Vec::with_capacity(batch.len());
        for op in &batch.operations {
            let rejection = match state.rejections.get_mut(&op.key) {
                Some((status, times)) if *times > 0 => {
                    *times -= 1;
                    Some(*status)
                }
                _ => None,
            };

            match rejection {
                Some(status) => {
                    errors = true;
                    items.push(BulkItem::Index(BulkItemResult::rejected(
                        &op.key,
                        status,
                        "scripted rejection",
                    )));
                }
                None => {
                    state.written.insert(op.key.clone(), op.edge.clone());
                    items.push(BulkItem::Index(BulkItemResult::ok(&op.key)));
                }
            }
        }

        Ok(BulkResponse {
            took: 1,
            errors,
            items,
        })
    }
}
