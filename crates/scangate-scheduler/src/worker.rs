//! Worker pool: drives dequeued jobs through the pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use scangate_core::JobId;
use scangate_core::evidence::EvidenceStore;
use scangate_core::finding::Finding;
use scangate_core::job::{FailureReason, Job, JobFailure, JobOutcome, JobStatus, JobSuccess};
use scangate_core::stage::{GateEvaluator, Normalizer, RiskScorer};
use scangate_store::{JobStore, ReleaseSnapshot, ReleaseStore, StoreError};

use crate::locks::ReleaseLocks;

/// The collaborators a worker drives a job through.
#[derive(Clone)]
pub struct PipelineStages {
    pub evidence: Arc<dyn EvidenceStore>,
    pub normalizer: Arc<dyn Normalizer>,
    pub scorer: Arc<dyn RiskScorer>,
    pub gate: Arc<dyn GateEvaluator>,
}

/// One executor of the fixed pool. Workers share a single receiver and
/// process jobs to a terminal state; every pipeline error is folded into
/// a structured job result, never propagated out of the loop.
pub struct Worker {
    id: usize,
    jobs: Arc<dyn JobStore>,
    releases: Arc<dyn ReleaseStore>,
    stages: PipelineStages,
    locks: Arc<ReleaseLocks>,
    rx: Arc<Mutex<mpsc::Receiver<JobId>>>,
    max_report_bytes: u64,
    retention: Duration,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        jobs: Arc<dyn JobStore>,
        releases: Arc<dyn ReleaseStore>,
        stages: PipelineStages,
        locks: Arc<ReleaseLocks>,
        rx: Arc<Mutex<mpsc::Receiver<JobId>>>,
        max_report_bytes: u64,
        retention: Duration,
    ) -> Self {
        Self {
            id,
            jobs,
            releases,
            stages,
            locks,
            rx,
            max_report_bytes,
            retention,
        }
    }

    /// Run the worker loop until the queue closes.
    pub async fn run(self) {
        info!(worker_id = self.id, "Starting worker");
        loop {
            let next = { self.rx.lock().await.recv().await };
            match next {
                Some(job_id) => self.process(job_id).await,
                None => {
                    info!(worker_id = self.id, "Job queue closed, stopping worker");
                    break;
                }
            }
        }
    }

    async fn process(&self, job_id: JobId) {
        let job = match self.jobs.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(%job_id, "Dequeued job missing from store");
                return;
            }
            Err(e) => {
                error!(%job_id, error = %e, "Failed to load dequeued job");
                return;
            }
        };

        // Pre-flight: verify stored payloads against the byte ceiling
        // before the job ever runs. Declared sizes were checked at
        // submission; this catches references whose declaration lied.
        if let Some(failure) = self.preflight(&job).await {
            warn!(
                job_id = %job.id,
                reason = failure.reason.code(),
                "Job rejected pre-flight"
            );
            self.finish(&job, JobStatus::Rejected, JobOutcome::Failed(failure))
                .await;
            return;
        }

        let job = match self.jobs.mark_running(job.id).await {
            Ok(job) => job,
            Err(e) => {
                error!(%job_id, error = %e, "Failed to transition job to running");
                return;
            }
        };
        info!(
            worker_id = self.id,
            job_id = %job.id,
            release_id = %job.release_id,
            attempt = job.attempt,
            "Job running"
        );

        match self.execute(&job).await {
            Ok(success) => {
                info!(
                    job_id = %job.id,
                    release_id = %job.release_id,
                    score = success.score,
                    decision = %success.decision.result,
                    "Job succeeded"
                );
                self.finish(&job, JobStatus::Succeeded, JobOutcome::Succeeded(success))
                    .await;
            }
            Err(failure) => {
                warn!(
                    job_id = %job.id,
                    release_id = %job.release_id,
                    reason = failure.reason.code(),
                    retryable = failure.retryable,
                    error = %failure.message,
                    "Job failed"
                );
                self.finish(&job, JobStatus::Failed, JobOutcome::Failed(failure))
                    .await;
            }
        }
    }

    async fn preflight(&self, job: &Job) -> Option<JobFailure> {
        for report in &job.reports {
            // Stat-only check; a missing blob surfaces as a fetch
            // failure once the job is running.
            if let Ok(Some(size)) = self.stages.evidence.size(&report.evidence_key).await {
                if size > self.max_report_bytes {
                    return Some(JobFailure::new(
                        FailureReason::ReportTooLarge,
                        format!(
                            "stored payload {} is {size} bytes, limit is {}",
                            report.evidence_key, self.max_report_bytes
                        ),
                    ));
                }
            }
        }
        None
    }

    async fn execute(&self, job: &Job) -> Result<JobSuccess, JobFailure> {
        // 1-2: fetch each raw report and normalize it.
        let mut new_findings: Vec<Finding> = Vec::new();
        let mut by_tool: BTreeMap<String, usize> = BTreeMap::new();
        for report in &job.reports {
            let payload = self
                .stages
                .evidence
                .get(&report.evidence_key)
                .await
                .map_err(|e| JobFailure::new(FailureReason::ArtifactUnavailable, e.to_string()))?
                .ok_or_else(|| {
                    JobFailure::new(
                        FailureReason::ArtifactUnavailable,
                        format!("evidence {} not found", report.evidence_key),
                    )
                })?;

            let observed_at = report.observed_at.unwrap_or(job.created_at);
            let findings = self
                .stages
                .normalizer
                .normalize(
                    report.tool,
                    &payload,
                    &report.asset,
                    &report.evidence_uri,
                    observed_at,
                )
                .map_err(|e| JobFailure::new(FailureReason::NormalizationError, e.to_string()))?;
            *by_tool.entry(report.tool.to_string()).or_insert(0) += findings.len();
            new_findings.extend(findings);
        }
        let ingested = new_findings.len();

        // 3-5: merge, score, evaluate, and commit under the per-release
        // lock so concurrent jobs for the same release take turns.
        let _guard = self.locks.acquire(&job.release_id).await;

        let current = self
            .releases
            .get(&job.release_id)
            .await
            .map_err(store_failure)?;
        let expected_version = current.as_ref().map(|r| r.version).unwrap_or(0);
        let existing = current.map(|r| r.findings).unwrap_or_default();
        let merged = merge_findings(existing, new_findings);

        let breakdown =
            self.stages
                .scorer
                .score(&job.release_id, &merged, &job.context, &job.exceptions);
        let decision = self
            .stages
            .gate
            .evaluate(&breakdown, &merged)
            .map_err(|e| JobFailure::new(FailureReason::EvaluationError, e.to_string()))?;

        let release = self
            .releases
            .commit(
                &job.release_id,
                expected_version,
                ReleaseSnapshot {
                    score: decision.score,
                    decision: decision.clone(),
                    findings: merged,
                },
            )
            .await
            .map_err(|e| match e {
                StoreError::VersionConflict { .. } => {
                    JobFailure::new(FailureReason::VersionConflict, e.to_string())
                }
                other => store_failure(other),
            })?;
        info!(
            release_id = %release.release_id,
            version = release.version,
            score = release.score,
            "Release committed"
        );

        Ok(JobSuccess {
            score: decision.score,
            decision,
            ingested,
            by_tool,
        })
    }

    async fn finish(&self, job: &Job, status: JobStatus, outcome: JobOutcome) {
        let expires_at = Utc::now() + self.retention;
        if let Err(e) = self.jobs.finish(job.id, status, outcome, expires_at).await {
            error!(job_id = %job.id, error = %e, "Failed to record job outcome");
        }
    }
}

fn store_failure(e: StoreError) -> JobFailure {
    JobFailure::new(FailureReason::StoreUnavailable, e.to_string())
}

/// Merge a batch's findings over the release's committed set: matching
/// ids are replaced by the newer record, new ids are appended.
fn merge_findings(existing: Vec<Finding>, new: Vec<Finding>) -> Vec<Finding> {
    let mut merged = existing;
    for finding in new {
        if let Some(slot) = merged.iter_mut().find(|f| f.id == finding.id) {
            *slot = finding;
        } else {
            merged.push(finding);
        }
    }
    merged
}
