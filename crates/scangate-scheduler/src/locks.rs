//! Per-release mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed lock table serializing the read-merge-commit section per
/// release id. Jobs for different releases run in parallel; jobs for the
/// same release take turns at the commit step.
#[derive(Default)]
pub struct ReleaseLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ReleaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a release, creating it on first use.
    pub async fn acquire(&self, release_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("release lock table poisoned");
            // Drop entries nobody holds so the table stays bounded by
            // the set of releases currently in flight.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(release_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
