//! Job records and the pipeline state machine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;
use crate::evidence::EvidenceKey;
use crate::finding::{Asset, ScannerKind};
use crate::release::{AssetContext, GateDecision, RiskException};

/// Reference to one raw scanner report held in the evidence store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRef {
    pub tool: ScannerKind,
    pub evidence_key: EvidenceKey,
    /// Size of the stored payload as declared at submission.
    pub size_bytes: u64,
    pub evidence_uri: String,
    pub asset: Asset,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of a job.
///
/// Moves only forward: `queued -> running -> succeeded | failed`. A job
/// dequeued with an over-limit payload terminates as `rejected` without
/// ever entering `running`. No state is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Rejected,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended without a committed release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A report payload could not be fetched from the evidence store.
    ArtifactUnavailable,
    /// A report payload did not parse as the declared scanner format.
    NormalizationError,
    /// The gate evaluator refused the scored release.
    EvaluationError,
    /// A job or release store operation failed mid-pipeline.
    StoreUnavailable,
    /// The compare-and-set commit lost to a competing write.
    VersionConflict,
    /// A stored payload exceeded the per-report byte ceiling.
    ReportTooLarge,
}

impl FailureReason {
    /// Whether resubmitting the same content (under a new idempotency
    /// key) can be expected to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureReason::ArtifactUnavailable
                | FailureReason::StoreUnavailable
                | FailureReason::VersionConflict
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::ArtifactUnavailable => "artifact_unavailable",
            FailureReason::NormalizationError => "normalization_error",
            FailureReason::EvaluationError => "evaluation_error",
            FailureReason::StoreUnavailable => "store_unavailable",
            FailureReason::VersionConflict => "version_conflict",
            FailureReason::ReportTooLarge => "report_too_large",
        }
    }
}

/// Structured error recorded on a `failed` or `rejected` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub reason: FailureReason,
    pub message: String,
    pub retryable: bool,
}

impl JobFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            retryable: reason.is_retryable(),
        }
    }
}

/// Result of a successfully committed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSuccess {
    pub score: f64,
    pub decision: GateDecision,
    /// Findings produced by this batch (before the release merge).
    pub ingested: usize,
    pub by_tool: BTreeMap<String, usize>,
}

/// Terminal outcome of a job. Present if and only if the status is
/// terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
    Succeeded(JobSuccess),
    Failed(JobFailure),
}

/// A batch-ingest job targeting a single release.
///
/// All fields other than `status`, `attempt`, `result`, `updated_at`, and
/// `expires_at` are written once at creation and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub idempotency_key: Option<String>,
    pub release_id: String,
    pub reports: Vec<ReportRef>,
    pub context: AssetContext,
    pub exceptions: Vec<RiskException>,
    pub status: JobStatus,
    pub attempt: u32,
    pub result: Option<JobOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the job reaches a terminal state; the reaper removes the
    /// record once this passes.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        release_id: impl Into<String>,
        reports: Vec<ReportRef>,
        context: AssetContext,
        exceptions: Vec<RiskException>,
        idempotency_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            idempotency_key,
            release_id: release_id.into(),
            reports,
            context,
            exceptions,
            status: JobStatus::Queued,
            attempt: 0,
            result: None,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Rejected.is_terminal());
    }

    #[test]
    fn retryable_follows_reason() {
        let failure = JobFailure::new(FailureReason::StoreUnavailable, "release store down");
        assert!(failure.retryable);
        let failure = JobFailure::new(FailureReason::NormalizationError, "bad json");
        assert!(!failure.retryable);
    }

    #[test]
    fn new_job_starts_queued_without_result() {
        let job = Job::new("rel-1", vec![], AssetContext::default(), vec![], None);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempt, 0);
        assert!(job.result.is_none());
        assert!(job.expires_at.is_none());
    }
}
