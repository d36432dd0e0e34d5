//! Data model for scanned documents and the edges derived from them.
//!
//! Source documents arrive from the search store as loosely structured JSON;
//! these types pin down the handful of fields the pipeline relies on so that
//! anything missing or mistyped fails at decode time instead of deep inside
//! the extractor.

use serde::{Deserialize, Serialize};

/// One content-addressed object as scanned from the source index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Content identifier of the object, in whatever encoding it was stored.
    pub id: String,
    #[serde(flatten)]
    pub fields: SourceFields,
}

/// The `_source` portion of a scanned document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFields {
    /// Parent references; absent for objects that link to nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(rename = "first-seen", default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
    #[serde(rename = "last-seen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: SourceFields::default(),
        }
    }

    /// Builder: attach a reference list.
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.fields.references = Some(references);
        self
    }

    /// Builder: set the first-seen timestamp.
    pub fn with_first_seen(mut self, ts: impl Into<String>) -> Self {
        self.fields.first_seen = Some(ts.into());
        self
    }

    /// Builder: set the last-seen timestamp.
    pub fn with_last_seen(mut self, ts: impl Into<String>) -> Self {
        self.fields.last_seen = Some(ts.into());
        self
    }

    pub fn references(&self) -> &[Reference] {
        self.fields.references.as_deref().unwrap_or(&[])
    }
}

/// An embedded pointer from a document to one of its parents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Identifier of the parent object.
    #[serde(rename = "parent_hash")]
    pub parent_identifier: String,
    /// Label under which the parent refers to this object (usually a filename).
    pub name: String,
}

impl Reference {
    pub fn new(parent_identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent_identifier: parent_identifier.into(),
            name: name.into(),
        }
    }
}

/// A normalized parent -> child link, the unit written to the destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Canonical identifier of the parent.
    pub from: String,
    /// Canonical identifier of the document that carried the reference.
    pub to: String,
    pub name: String,
    /// Best available observation time, whole seconds, UTC.
    #[serde(rename = "seen")]
    pub seen_at: Option<String>,
}

/// An edge paired with its destination key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedEdge {
    pub key: String,
    pub edge: EdgeRecord,
}
