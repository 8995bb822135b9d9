//! Evidence storage abstraction.
//!
//! Raw scanner payloads are stored content-addressed: the key is the
//! sha-256 digest of the payload, so retried submissions of the same
//! report deduplicate to a single blob.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

/// Content-addressed key for a stored evidence blob (`sha256:<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceKey(String);

impl EvidenceKey {
    /// Compute the key for a payload.
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(format!("sha256:{}", hex::encode(digest)))
    }

    /// Reconstruct a key from its string form.
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI form used in finding evidence references.
    pub fn uri(&self) -> String {
        format!("evidence://{}", self.0)
    }
}

impl std::fmt::Display for EvidenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for evidence blob storage backends.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Store a payload, returning its content-addressed key.
    async fn put(&self, data: Bytes) -> Result<EvidenceKey>;

    /// Retrieve a payload by key.
    async fn get(&self, key: &EvidenceKey) -> Result<Option<Bytes>>;

    /// Size in bytes of a stored payload, without fetching it.
    async fn size(&self, key: &EvidenceKey) -> Result<Option<u64>>;
}
