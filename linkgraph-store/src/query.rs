//! Scan request construction.
//!
//! Only the two selections the pipeline needs are modelled: a `first-seen`
//! window over documents that carry references, and match-all.

use linkgraph_core::Partition;
use serde::Serialize;
use serde_json::{json, Value};

/// Field holding the first observation time of a source document.
pub const FIRST_SEEN_FIELD: &str = "first-seen";
/// Field holding a source document's parent references.
pub const REFERENCES_FIELD: &str = "references";
/// Field holding a source document's last observation time.
pub const LAST_SEEN_FIELD: &str = "last-seen";

/// Which documents a scan selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// Every document in the index.
    All,
    /// Documents whose `field` lies in `[gte, lt)` and that have `required`.
    Window {
        field: String,
        gte: String,
        lt: String,
        format: String,
        required: String,
    },
}

impl Selection {
    /// Documents first seen inside the partition that carry references.
    pub fn for_partition(partition: &Partition) -> Self {
        let (gte, lt) = partition.bounds();
        Selection::Window {
            field: FIRST_SEEN_FIELD.to_string(),
            gte,
            lt,
            format: partition.range_format().to_string(),
            required: REFERENCES_FIELD.to_string(),
        }
    }

    fn to_query(&self) -> Value {
        match self {
            Selection::All => json!({ "match_all": {} }),
            Selection::Window {
                field,
                gte,
                lt,
                format,
                required,
            } => json!({
                "bool": {
                    "filter": [
                        { "range": { field.as_str(): { "gte": gte, "lt": lt, "format": format } } },
                        { "exists": { "field": required } }
                    ]
                }
            }),
        }
    }
}

/// A paginated scan against one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub index: String,
    pub selection: Selection,
    /// Documents per page.
    pub page_size: usize,
    /// `_source` fields to return.
    pub fields: Vec<String>,
    /// Cursor time-to-live, renewed on every page request (e.g. `1m`).
    pub keep_alive: String,
}

impl ScanRequest {
    /// Scan of source documents for one partition.
    pub fn documents(index: &str, partition: &Partition, page_size: usize, keep_alive: &str) -> Self {
        Self {
            index: index.to_string(),
            selection: Selection::for_partition(partition),
            page_size,
            fields: vec![
                REFERENCES_FIELD.to_string(),
                FIRST_SEEN_FIELD.to_string(),
                LAST_SEEN_FIELD.to_string(),
            ],
            keep_alive: keep_alive.to_string(),
        }
    }

    /// Scan of written links, `from` and `to` only.
    pub fn link_pairs(index: &str, page_size: usize, keep_alive: &str) -> Self {
        Self {
            index: index.to_string(),
            selection: Selection::All,
            page_size,
            fields: vec!["from".to_string(), "to".to_string()],
            keep_alive: keep_alive.to_string(),
        }
    }

    /// Request body of the opening search, in index order (`_doc`).
    pub fn body(&self) -> Value {
        json!({
            "query": self.selection.to_query(),
            "size": self.page_size,
            "sort": ["_doc"],
            "_source": self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_body() {
        let partition = Partition::month(2021, 12).unwrap();
        let request = ScanRequest::documents("ipfs_files", &partition, 100, "1m");
        let body = request.body();

        let range = &body["query"]["bool"]["filter"][0]["range"]["first-seen"];
        assert_eq!(range["gte"], "2021-12");
        assert_eq!(range["lt"], "2022-01");
        assert_eq!(range["format"], "yyyy-MM");
        assert_eq!(body["query"]["bool"]["filter"][1]["exists"]["field"], "references");
        assert_eq!(body["size"], 100);
        assert_eq!(body["sort"][0], "_doc");
        assert_eq!(body["_source"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_year_body() {
        let request = ScanRequest::documents("ipfs_files", &Partition::year(2016), 50, "1m");
        let range = &request.body()["query"]["bool"]["filter"][0]["range"]["first-seen"];
        assert_eq!(range["gte"], "2016");
        assert_eq!(range["lt"], "2017");
        assert_eq!(range["format"], "yyyy");
    }

    #[test]
    fn test_link_pairs_body() {
        let body = ScanRequest::link_pairs("ipfs_links", 1000, "1m").body();
        assert!(body["query"]["match_all"].is_object());
        assert_eq!(body["_source"], json!(["from", "to"]));
    }
}
