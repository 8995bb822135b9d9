//! Scheduler facade: wires the queue, worker pool, and reaper.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use scangate_config::Settings;
use scangate_core::JobId;
use scangate_core::job::Job;
use scangate_store::{JobStore, ReleaseStore, StoreResult};

use crate::locks::ReleaseLocks;
use crate::queue::{BatchSubmission, JobQueue, Submission, SubmitError, SubmitLimits};
use crate::reaper::Reaper;
use crate::worker::{PipelineStages, Worker};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub max_reports_per_job: usize,
    pub max_report_bytes: u64,
    pub job_retention: Duration,
    pub reap_interval: Duration,
    pub stale_running_after: Duration,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            queue_capacity: settings.max_job_queue_size,
            worker_count: settings.worker_count,
            max_reports_per_job: settings.max_reports_per_job,
            max_report_bytes: settings.max_report_bytes,
            job_retention: settings.job_retention(),
            reap_interval: settings.reap_interval(),
            stale_running_after: settings.stale_running_after(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Owns the bounded queue and the background tasks processing it.
///
/// The worker count is fixed at start and does not scale; dropping the
/// scheduler closes the queue, which lets each worker finish its
/// current job and exit.
pub struct Scheduler {
    queue: JobQueue,
    jobs: Arc<dyn JobStore>,
    workers: Vec<JoinHandle<()>>,
    reaper: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the worker pool and reaper against the given stores and
    /// pipeline stages.
    pub fn start(
        config: SchedulerConfig,
        jobs: Arc<dyn JobStore>,
        releases: Arc<dyn ReleaseStore>,
        stages: PipelineStages,
    ) -> Self {
        let limits = SubmitLimits {
            max_reports_per_job: config.max_reports_per_job,
            max_report_bytes: config.max_report_bytes,
        };
        let (queue, rx) = JobQueue::new(jobs.clone(), limits, config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let locks = Arc::new(ReleaseLocks::new());
        let retention = chrono::Duration::seconds(config.job_retention.as_secs() as i64);

        let workers = (0..config.worker_count.max(1))
            .map(|id| {
                let worker = Worker::new(
                    id,
                    jobs.clone(),
                    releases.clone(),
                    stages.clone(),
                    locks.clone(),
                    rx.clone(),
                    config.max_report_bytes,
                    retention,
                );
                tokio::spawn(worker.run())
            })
            .collect();

        let reaper = tokio::spawn(
            Reaper::new(jobs.clone(), config.reap_interval, config.stale_running_after).run(),
        );

        Self {
            queue,
            jobs,
            workers,
            reaper,
        }
    }

    /// Submit a batch; see [`JobQueue::submit`].
    pub async fn submit(&self, submission: BatchSubmission) -> Result<Submission, SubmitError> {
        self.queue.submit(submission).await
    }

    /// Look up a job by id. Returns `None` for unknown ids and for jobs
    /// the reaper has removed.
    pub async fn job(&self, id: JobId) -> StoreResult<Option<Job>> {
        self.jobs.get(id).await
    }

    /// Number of spawned workers (fixed for the process lifetime).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Workers drain naturally once the queue sender drops with this
        // struct; the reaper loops forever and must be stopped here.
        self.reaper.abort();
    }
}
