//! The search-store seam.
//!
//! Everything the pipeline needs from the store goes through
//! [`SearchBackend`]: open a paginated scan, fetch the next page, release the
//! cursor, and submit a bulk batch. The HTTP client implements it for real
//! clusters; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::query::ScanRequest;
use crate::sink::BulkBatch;

/// Operations the pipeline performs against a search store.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Issue the opening request of a scan and return its first page.
    async fn open_scan(&self, request: &ScanRequest) -> Result<ScanPage>;

    /// Fetch the page following `cursor`, renewing it for `keep_alive`.
    async fn next_page(&self, cursor: &str, keep_alive: &str) -> Result<ScanPage>;

    /// Release a cursor.
    async fn release(&self, cursor: &str) -> Result<()>;

    /// Submit one bulk batch and return the per-record outcome.
    async fn bulk(&self, batch: &BulkBatch) -> Result<BulkResponse>;
}

/// One page of a scan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanPage {
    #[serde(rename = "_scroll_id", default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub hits: Hits,
}

impl ScanPage {
    pub fn total(&self) -> Option<u64> {
        self.hits.total.as_ref().map(HitTotal::value)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<HitTotal>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Total match count; older clusters report a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HitTotal {
    Count(u64),
    Tracked { value: u64 },
}

impl HitTotal {
    pub fn value(&self) -> u64 {
        match self {
            HitTotal::Count(n) => *n,
            HitTotal::Tracked { value } => *value,
        }
    }
}

/// A hit before it is decoded into a typed document.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Response of a bulk request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// One entry of a bulk response, keyed by the action that produced it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItem {
    Index(BulkItemResult),
    Create(BulkItemResult),
    Update(BulkItemResult),
    Delete(BulkItemResult),
}

impl BulkItem {
    pub fn result(&self) -> &BulkItemResult {
        match self {
            BulkItem::Index(r) | BulkItem::Create(r) | BulkItem::Update(r) | BulkItem::Delete(r) => r,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            status: 201,
            error: None,
        }
    }

    pub fn rejected(id: impl Into<String>, status: u16, reason: &str) -> Self {
        Self {
            id: Some(id.into()),
            status,
            error: Some(serde_json::json!({ "type": "rejected", "reason": reason })),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }

    /// Whether the store asked for the record to be sent again later.
    pub fn is_throttled(&self) -> bool {
        self.status == 429
    }

    /// Short description of the rejection.
    pub fn reason(&self) -> String {
        match &self.error {
            Some(Value::Object(map)) => {
                let kind = map.get("type").and_then(Value::as_str).unwrap_or("error");
                match map.get("reason").and_then(Value::as_str) {
                    Some(reason) => format!("{}: {}", kind, reason),
                    None => kind.to_string(),
                }
            }
            Some(other) => other.to_string(),
            None => format!("HTTP {}", self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_page_decode() {
        let page: ScanPage = serde_json::from_value(json!({
            "_scroll_id": "c1",
            "took": 3,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_index": "ipfs_files", "_id": "Qm1", "_source": {"references": []}},
                    {"_index": "ipfs_files", "_id": "Qm2", "_source": {}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(page.cursor.as_deref(), Some("c1"));
        assert_eq!(page.total(), Some(2));
        assert_eq!(page.hits.hits[1].id, "Qm2");
    }

    #[test]
    fn test_legacy_total() {
        let page: ScanPage =
            serde_json::from_value(json!({"hits": {"total": 17, "hits": []}})).unwrap();
        assert_eq!(page.total(), Some(17));
        assert!(page.cursor.is_none());
    }

    #[test]
    fn test_bulk_response_decode() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 30,
            "errors": true,
            "items": [
                {"index": {"_index": "ipfs_links", "_id": "k1", "status": 201, "result": "created"}},
                {"index": {"_index": "ipfs_links", "_id": "k2", "status": 409,
                           "error": {"type": "version_conflict_engine_exception", "reason": "conflict"}}},
                {"index": {"_id": "k3", "status": 429,
                           "error": {"type": "es_rejected_execution_exception"}}}
            ]
        }))
        .unwrap();

        let results: Vec<_> = response.items.iter().map(BulkItem::result).collect();
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(results[1].reason(), "version_conflict_engine_exception: conflict");
        assert!(results[2].is_throttled());
        assert_eq!(results[2].reason(), "es_rejected_execution_exception");
    }
}
