//! Error types for linkgraph-core.

use thiserror::Error;

/// Result type alias for linkgraph-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while turning source documents into edge records.
///
/// Every variant signals a data-integrity problem in the enclosing partition;
/// none of them is meant to be skipped record by record.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A content identifier could not be parsed or re-encoded.
    #[error("Invalid content identifier '{value}': {source}")]
    InvalidIdentifier {
        /// The identifier as it appeared in the source document.
        value: String,
        /// Underlying decoding error.
        #[source]
        source: cid::Error,
    },

    /// A timestamp field could not be interpreted.
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp {
        /// The raw timestamp text.
        value: String,
    },

    /// A partition plan was rejected (bad month, empty year list, ...).
    #[error("Invalid partition plan: {message}")]
    InvalidPartition {
        /// Description of what is wrong with the plan.
        message: String,
    },
}

impl CoreError {
    pub(crate) fn partition(message: impl Into<String>) -> Self {
        CoreError::InvalidPartition {
            message: message.into(),
        }
    }
}
