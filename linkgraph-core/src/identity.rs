//! Deterministic destination keys for edge records.
//!
//! The key is a digest of `ipfs://{from}-ipfs://{to}-{name}`, rendered as
//! standard base64 without padding. Equal (from, to, name) triples always
//! map to the same key, which turns repeated loads into upserts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::types::{EdgeRecord, KeyedEdge};

/// Digest used to derive edge keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    /// 160-bit SHA-1; matches keys written by earlier loads.
    #[default]
    Sha1,
    /// 256-bit SHA-256.
    Sha256,
}

impl FromStr for KeyDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(KeyDigest::Sha1),
            "sha256" | "sha-256" => Ok(KeyDigest::Sha256),
            _ => Err(format!("Unknown key digest: '{}'", s)),
        }
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDigest::Sha1 => write!(f, "sha1"),
            KeyDigest::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Stateless key assigner.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyAssigner {
    digest: KeyDigest,
}

impl KeyAssigner {
    pub fn new(digest: KeyDigest) -> Self {
        Self { digest }
    }

    pub fn digest(&self) -> KeyDigest {
        self.digest
    }

    /// Compute the key for an edge.
    pub fn key_for(&self, edge: &EdgeRecord) -> String {
        let input = key_input(edge);
        let bytes = match self.digest {
            KeyDigest::Sha1 => Sha1::digest(input.as_bytes()).to_vec(),
            KeyDigest::Sha256 => Sha256::digest(input.as_bytes()).to_vec(),
        };
        STANDARD_NO_PAD.encode(bytes)
    }

    /// Attach a key to an edge.
    pub fn assign(&self, edge: EdgeRecord) -> KeyedEdge {
        KeyedEdge {
            key: self.key_for(&edge),
            edge,
        }
    }
}

fn key_input(edge: &EdgeRecord) -> String {
    format!("ipfs://{}-ipfs://{}-{}", edge.from, edge.to, edge.name)
}
