//! Content identifier canonicalization.
//!
//! The same object can be addressed by a CIDv0 (`Qm...`, base58btc) or by a
//! CIDv1 in any multibase (`bafy...`, `z...`, `k51...`). Edges are keyed on
//! identifier text, so every identifier is re-encoded as CIDv1 base32 before
//! it reaches an [`EdgeRecord`](crate::types::EdgeRecord).

use cid::Cid;

use crate::error::{CoreError, Result};

/// Parse `value` in whatever encoding it arrives and re-serialize it as
/// CIDv1 in the default (base32 lower-case) multibase.
///
/// Canonicalizing an already-canonical identifier returns it unchanged.
pub fn canonicalize(value: &str) -> Result<String> {
    let invalid = |source| CoreError::InvalidIdentifier {
        value: value.to_string(),
        source,
    };

    let cid = Cid::try_from(value).map_err(invalid)?;
    let v1 = cid.into_v1().map_err(invalid)?;
    Ok(v1.to_string())
}
