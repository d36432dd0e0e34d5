//! Typed decoding of scanned hits.

use linkgraph_core::{SourceDocument, SourceFields};
use serde::{Deserialize, Serialize};

use crate::backend::RawHit;
use crate::error::{Result, StoreError};

/// A document type a scan can yield.
pub trait FromHit: Sized {
    fn from_hit(hit: RawHit) -> Result<Self>;
}

fn decode<T: for<'de> Deserialize<'de>>(hit: RawHit) -> Result<(String, T)> {
    let RawHit { id, source } = hit;
    match serde_json::from_value(source) {
        Ok(fields) => Ok((id, fields)),
        Err(source) => Err(StoreError::MalformedDocument { id, source }),
    }
}

impl FromHit for SourceDocument {
    fn from_hit(hit: RawHit) -> Result<Self> {
        let (id, fields) = decode::<SourceFields>(hit)?;
        Ok(SourceDocument { id, fields })
    }
}

/// A written link as stored in the destination, `from` and `to` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPair {
    pub from: String,
    pub to: String,
}

impl FromHit for LinkPair {
    fn from_hit(hit: RawHit) -> Result<Self> {
        decode::<LinkPair>(hit).map(|(_, pair)| pair)
    }
}
