//! In-memory evidence blob store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use scangate_core::Result;
use scangate_core::evidence::{EvidenceKey, EvidenceStore};

/// Content-addressed in-memory blob store, the default backend.
#[derive(Default)]
pub struct MemoryEvidenceStore {
    blobs: Mutex<HashMap<EvidenceKey, Bytes>>,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn put(&self, data: Bytes) -> Result<EvidenceKey> {
        let key = EvidenceKey::from_bytes(&data);
        let mut blobs = self.blobs.lock().expect("evidence store lock poisoned");
        blobs.insert(key.clone(), data);
        Ok(key)
    }

    async fn get(&self, key: &EvidenceKey) -> Result<Option<Bytes>> {
        let blobs = self.blobs.lock().expect("evidence store lock poisoned");
        Ok(blobs.get(key).cloned())
    }

    async fn size(&self, key: &EvidenceKey) -> Result<Option<u64>> {
        let blobs = self.blobs.lock().expect("evidence store lock poisoned");
        Ok(blobs.get(key).map(|data| data.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = MemoryEvidenceStore::new();
        let key = store.put(Bytes::from_static(b"{\"a\":1}")).await.unwrap();
        assert_eq!(
            store.get(&key).await.unwrap().unwrap(),
            Bytes::from_static(b"{\"a\":1}")
        );
        assert_eq!(store.size(&key).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn identical_payloads_deduplicate() {
        let store = MemoryEvidenceStore::new();
        let a = store.put(Bytes::from_static(b"same")).await.unwrap();
        let b = store.put(Bytes::from_static(b"same")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryEvidenceStore::new();
        let key = EvidenceKey::from_bytes(b"never stored");
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.size(&key).await.unwrap().is_none());
    }
}
