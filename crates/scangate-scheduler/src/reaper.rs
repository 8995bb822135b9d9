//! Background expiry of terminal job records.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use scangate_store::JobStore;

/// Periodic sweep that removes terminal jobs past their retention
/// window (freeing their idempotency keys) and surfaces long-running
/// jobs for operators. Queued and running jobs are never removed.
pub struct Reaper {
    jobs: Arc<dyn JobStore>,
    interval: Duration,
    stale_after: chrono::Duration,
}

impl Reaper {
    pub fn new(jobs: Arc<dyn JobStore>, interval: Duration, stale_after: Duration) -> Self {
        Self {
            jobs,
            interval,
            stale_after: chrono::Duration::seconds(stale_after.as_secs() as i64),
        }
    }

    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// One sweep. Works from a snapshot of the store, so jobs created
    /// or completed mid-sweep are simply picked up next time.
    pub async fn sweep(&self) {
        let now = Utc::now();
        match self.jobs.remove_expired(now).await {
            Ok(removed) if !removed.is_empty() => {
                info!(count = removed.len(), "Reaped expired terminal jobs");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Expiry sweep failed"),
        }

        match self.jobs.stale_running(now - self.stale_after).await {
            Ok(stale) => {
                for job in stale {
                    warn!(
                        job_id = %job.id,
                        release_id = %job.release_id,
                        updated_at = %job.updated_at,
                        "Job running past staleness threshold"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Staleness scan failed"),
        }
    }
}
