//! Bounded job queue with idempotent submission.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use scangate_core::JobId;
use scangate_core::job::{Job, ReportRef};
use scangate_core::release::{AssetContext, RiskException};
use scangate_store::{JobStore, KeyedInsert, StoreError};

/// Ceilings enforced synchronously, before any job record exists.
#[derive(Debug, Clone, Copy)]
pub struct SubmitLimits {
    pub max_reports_per_job: usize,
    pub max_report_bytes: u64,
}

/// A batch of scanner reports targeting one release.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub release_id: String,
    pub reports: Vec<ReportRef>,
    pub context: AssetContext,
    pub exceptions: Vec<RiskException>,
    pub idempotency_key: Option<String>,
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub enum Submission {
    /// A new job was created and enqueued.
    Accepted(Job),
    /// A live job already holds the idempotency key. If it is terminal
    /// its memoized result rides along; nothing is re-executed.
    Existing(Job),
}

impl Submission {
    pub fn job(&self) -> &Job {
        match self {
            Submission::Accepted(job) | Submission::Existing(job) => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            Submission::Accepted(job) | Submission::Existing(job) => job,
        }
    }
}

/// Synchronous rejection of a submission. No job record is created.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("batch has {count} reports, limit is {limit}")]
    TooManyReports { count: usize, limit: usize },

    #[error("report {index} is {size} bytes, limit is {limit}")]
    ReportTooLarge { index: usize, size: u64, limit: u64 },

    #[error("job queue is at capacity")]
    QueueFull,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Machine-readable reason code for API clients.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SubmitError::TooManyReports { .. } => "too_many_reports",
            SubmitError::ReportTooLarge { .. } => "report_too_large",
            SubmitError::QueueFull => "queue_full",
            SubmitError::Store(_) => "store_unavailable",
        }
    }
}

/// Bounded FIFO queue in front of the worker pool.
///
/// The channel capacity is the only admission authority: `submit`
/// reserves a slot before creating any record, so a rejected submission
/// leaves no state behind and an accepted one cannot fail to enqueue.
pub struct JobQueue {
    jobs: Arc<dyn JobStore>,
    tx: mpsc::Sender<JobId>,
    limits: SubmitLimits,
}

impl JobQueue {
    /// Create a queue with the given capacity, returning the receiver
    /// side for the worker pool.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        limits: SubmitLimits,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<JobId>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { jobs, tx, limits }, rx)
    }

    /// Submit a batch. Fails fast with a reason code on limit or
    /// capacity violations; resubmissions under a known idempotency key
    /// return the existing job without enqueueing new work.
    pub async fn submit(&self, submission: BatchSubmission) -> Result<Submission, SubmitError> {
        if submission.reports.len() > self.limits.max_reports_per_job {
            return Err(SubmitError::TooManyReports {
                count: submission.reports.len(),
                limit: self.limits.max_reports_per_job,
            });
        }
        for (index, report) in submission.reports.iter().enumerate() {
            if report.size_bytes > self.limits.max_report_bytes {
                return Err(SubmitError::ReportTooLarge {
                    index,
                    size: report.size_bytes,
                    limit: self.limits.max_report_bytes,
                });
            }
        }

        // Reserve the queue slot before touching the store: a full queue
        // must reject without creating a job, and a created job must
        // never fail to enqueue.
        let permit = self.tx.try_reserve().map_err(|_| SubmitError::QueueFull)?;

        let job = Job::new(
            submission.release_id,
            submission.reports,
            submission.context,
            submission.exceptions,
            submission.idempotency_key,
        );
        match self.jobs.create(job).await? {
            KeyedInsert::Created(job) => {
                permit.send(job.id);
                info!(
                    job_id = %job.id,
                    release_id = %job.release_id,
                    reports = job.reports.len(),
                    "Job enqueued"
                );
                Ok(Submission::Accepted(job))
            }
            KeyedInsert::Existing(job) => {
                // The reserved slot is released; no duplicate work runs.
                drop(permit);
                debug!(
                    job_id = %job.id,
                    status = %job.status,
                    "Idempotent resubmission returned existing job"
                );
                Ok(Submission::Existing(job))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scangate_core::evidence::EvidenceKey;
    use scangate_core::finding::{Asset, Criticality, DataClassification, ScannerKind};
    use scangate_store::MemoryJobStore;

    fn report(size_bytes: u64) -> ReportRef {
        ReportRef {
            tool: ScannerKind::Gitleaks,
            evidence_key: EvidenceKey::from_bytes(b"payload"),
            size_bytes,
            evidence_uri: "https://evidence.local/scan.json".to_string(),
            asset: Asset {
                repo: "gitlab.example.com/acme/payments".to_string(),
                service: "payments-api".to_string(),
                owner: "payments".to_string(),
                environment: "prod".to_string(),
                criticality: Criticality::Tier1,
                data_classification: DataClassification::Confidential,
            },
            observed_at: None,
        }
    }

    fn submission(reports: Vec<ReportRef>, key: Option<&str>) -> BatchSubmission {
        BatchSubmission {
            release_id: "rel-1".to_string(),
            reports,
            context: AssetContext::default(),
            exceptions: vec![],
            idempotency_key: key.map(String::from),
        }
    }

    fn queue(limits: SubmitLimits, capacity: usize) -> (JobQueue, mpsc::Receiver<JobId>) {
        JobQueue::new(Arc::new(MemoryJobStore::new()), limits, capacity)
    }

    const LIMITS: SubmitLimits = SubmitLimits {
        max_reports_per_job: 2,
        max_report_bytes: 1024,
    };

    #[tokio::test]
    async fn too_many_reports_is_rejected_without_a_record() {
        let (queue, _rx) = queue(LIMITS, 8);
        let err = queue
            .submit(submission(
                vec![report(10), report(10), report(10)],
                Some("idem-1"),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "too_many_reports");

        // The idempotency key was never bound: a corrected resubmission
        // creates a fresh job instead of returning a rejected one.
        let accepted = queue
            .submit(submission(vec![report(10)], Some("idem-1")))
            .await
            .unwrap();
        assert!(matches!(accepted, Submission::Accepted(_)));
    }

    #[tokio::test]
    async fn oversize_report_is_rejected_with_its_index() {
        let (queue, _rx) = queue(LIMITS, 8);
        let err = queue
            .submit(submission(vec![report(10), report(4096)], None))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "report_too_large");
        match err {
            SubmitError::ReportTooLarge { index, size, limit } => {
                assert_eq!(index, 1);
                assert_eq!(size, 4096);
                assert_eq!(limit, 1024);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn full_queue_rejects_the_excess() {
        let (queue, _rx) = queue(LIMITS, 2);
        queue.submit(submission(vec![report(1)], None)).await.unwrap();
        queue.submit(submission(vec![report(1)], None)).await.unwrap();

        let err = queue
            .submit(submission(vec![report(1)], Some("idem-full")))
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "queue_full");
    }

    #[tokio::test]
    async fn duplicate_key_does_not_consume_capacity() {
        let (queue, _rx) = queue(LIMITS, 2);
        let first = queue
            .submit(submission(vec![report(1)], Some("idem-1")))
            .await
            .unwrap();

        for _ in 0..5 {
            let again = queue
                .submit(submission(vec![report(1)], Some("idem-1")))
                .await
                .unwrap();
            assert_eq!(again.job().id, first.job().id);
        }

        // One slot is still free.
        queue.submit(submission(vec![report(1)], None)).await.unwrap();
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (queue, mut rx) = queue(LIMITS, 8);
        let a = queue
            .submit(submission(vec![report(1)], None))
            .await
            .unwrap();
        let b = queue
            .submit(submission(vec![report(1)], None))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), a.job().id);
        assert_eq!(rx.recv().await.unwrap(), b.job().id);
    }
}
