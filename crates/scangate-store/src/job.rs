//! Job store: durable job records keyed by id and idempotency key.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use scangate_core::JobId;
use scangate_core::job::{Job, JobOutcome, JobStatus};

use crate::{StoreError, StoreResult};

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone)]
pub enum KeyedInsert {
    /// The job was inserted; no live job held its idempotency key.
    Created(Job),
    /// A live job already holds the idempotency key; the stored record
    /// (possibly terminal, with its memoized result) is returned.
    Existing(Job),
}

impl KeyedInsert {
    pub fn into_job(self) -> Job {
        match self {
            KeyedInsert::Created(job) | KeyedInsert::Existing(job) => job,
        }
    }
}

/// Which terminal states a job may be finished into from its current one.
fn can_finish(from: JobStatus, to: JobStatus) -> bool {
    match from {
        // A queued job can be refused pre-flight or failed without running.
        JobStatus::Queued => matches!(to, JobStatus::Rejected | JobStatus::Failed),
        JobStatus::Running => matches!(to, JobStatus::Succeeded | JobStatus::Failed),
        _ => false,
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a job, treating its idempotency key (when present) as
    /// atomic create-if-absent: if a live job already holds the key, that
    /// job is returned unchanged and nothing is inserted.
    async fn create(&self, job: Job) -> StoreResult<KeyedInsert>;

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// `queued -> running`; bumps the attempt counter.
    async fn mark_running(&self, id: JobId) -> StoreResult<Job>;

    /// Transition into a terminal state with its outcome, setting
    /// `expires_at` for the reaper.
    async fn finish(
        &self,
        id: JobId,
        status: JobStatus,
        outcome: JobOutcome,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Job>;

    /// Remove terminal jobs whose `expires_at` has passed, freeing their
    /// idempotency keys. Returns the removed ids. Never touches queued or
    /// running jobs.
    async fn remove_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobId>>;

    /// Running jobs not updated since `cutoff`, for operator staleness
    /// monitoring.
    async fn stale_running(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Job>>;
}

#[derive(Default)]
struct MemoryJobs {
    jobs: HashMap<JobId, Job>,
    by_key: HashMap<String, JobId>,
}

/// In-memory job store, the default backend.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<MemoryJobs>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> StoreResult<KeyedInsert> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        if let Some(key) = &job.idempotency_key {
            if let Some(existing_id) = inner.by_key.get(key) {
                let existing = inner.jobs[existing_id].clone();
                return Ok(KeyedInsert::Existing(existing));
            }
            inner.by_key.insert(key.clone(), job.id);
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(KeyedInsert::Created(job))
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner.jobs.get(&id).cloned())
    }

    async fn mark_running(&self, id: JobId) -> StoreResult<Job> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        if job.status != JobStatus::Queued {
            return Err(StoreError::InvalidTransition(format!(
                "job {id}: {} -> running",
                job.status
            )));
        }
        job.status = JobStatus::Running;
        job.attempt += 1;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn finish(
        &self,
        id: JobId,
        status: JobStatus,
        outcome: JobOutcome,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Job> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        if !can_finish(job.status, status) {
            return Err(StoreError::InvalidTransition(format!(
                "job {id}: {} -> {status}",
                job.status
            )));
        }
        job.status = status;
        job.result = Some(outcome);
        job.updated_at = Utc::now();
        job.expires_at = Some(expires_at);
        Ok(job.clone())
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobId>> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let expired: Vec<JobId> = inner
            .jobs
            .values()
            .filter(|job| {
                job.is_terminal() && job.expires_at.is_some_and(|expires| now > expires)
            })
            .map(|job| job.id)
            .collect();
        for id in &expired {
            if let Some(job) = inner.jobs.remove(id) {
                if let Some(key) = job.idempotency_key {
                    inner.by_key.remove(&key);
                }
            }
        }
        Ok(expired)
    }

    async fn stale_running(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Running && job.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of [`JobStore`].
///
/// The full job record lives in a jsonb payload column; status and
/// expiry are mirrored into columns for the reaper's delete and the
/// unique idempotency-key constraint provides create-if-absent.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(payload: serde_json::Value) -> StoreResult<Job> {
        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: Job) -> StoreResult<KeyedInsert> {
        let payload = serde_json::to_value(&job)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO jobs (id, idempotency_key, status, updated_at, expires_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.idempotency_key)
        .bind(job.status.as_str())
        .bind(job.updated_at)
        .bind(job.expires_at)
        .bind(&payload)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 1 {
            return Ok(KeyedInsert::Created(job));
        }

        let key = job
            .idempotency_key
            .as_deref()
            .expect("insert without key cannot conflict");
        let row = sqlx::query("SELECT payload FROM jobs WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job for idempotency key {key}")))?;
        Ok(KeyedInsert::Existing(Self::decode(row.get("payload"))?))
    }

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>> {
        let row = sqlx::query("SELECT payload FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::decode(r.get("payload"))).transpose()
    }

    async fn mark_running(&self, id: JobId) -> StoreResult<Job> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT payload FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        let mut job = Self::decode(row.get("payload"))?;
        if job.status != JobStatus::Queued {
            return Err(StoreError::InvalidTransition(format!(
                "job {id}: {} -> running",
                job.status
            )));
        }
        job.status = JobStatus::Running;
        job.attempt += 1;
        job.updated_at = Utc::now();

        sqlx::query("UPDATE jobs SET status = $2, updated_at = $3, payload = $4 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(job.status.as_str())
            .bind(job.updated_at)
            .bind(serde_json::to_value(&job)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(job)
    }

    async fn finish(
        &self,
        id: JobId,
        status: JobStatus,
        outcome: JobOutcome,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Job> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT payload FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        let mut job = Self::decode(row.get("payload"))?;
        if !can_finish(job.status, status) {
            return Err(StoreError::InvalidTransition(format!(
                "job {id}: {} -> {status}",
                job.status
            )));
        }
        job.status = status;
        job.result = Some(outcome);
        job.updated_at = Utc::now();
        job.expires_at = Some(expires_at);

        sqlx::query(
            "UPDATE jobs SET status = $2, updated_at = $3, expires_at = $4, payload = $5 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(job.status.as_str())
        .bind(job.updated_at)
        .bind(job.expires_at)
        .bind(serde_json::to_value(&job)?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(job)
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobId>> {
        let rows = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('succeeded', 'failed', 'rejected') AND expires_at < $1
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| JobId::from_uuid(row.get("id")))
            .collect())
    }

    async fn stale_running(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        let rows =
            sqlx::query("SELECT payload FROM jobs WHERE status = 'running' AND updated_at < $1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|row| Self::decode(row.get("payload")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scangate_core::job::{FailureReason, JobFailure, JobSuccess};
    use scangate_core::release::{AssetContext, GateDecision, GateResult};

    fn job(key: Option<&str>) -> Job {
        Job::new(
            "rel-1",
            vec![],
            AssetContext::default(),
            vec![],
            key.map(String::from),
        )
    }

    fn success() -> JobOutcome {
        JobOutcome::Succeeded(JobSuccess {
            score: 12.0,
            decision: GateDecision {
                result: GateResult::Pass,
                score: 12.0,
                reasons: vec!["no_open_risks".to_string()],
                evidence: vec![],
                policy_version: "warn-only-v1".to_string(),
            },
            ingested: 0,
            by_tool: Default::default(),
        })
    }

    #[tokio::test]
    async fn keyed_create_is_create_if_absent() {
        let store = MemoryJobStore::new();
        let first = store.create(job(Some("idem-1"))).await.unwrap();
        let KeyedInsert::Created(first) = first else {
            panic!("expected created");
        };

        let second = store.create(job(Some("idem-1"))).await.unwrap();
        let KeyedInsert::Existing(second) = second else {
            panic!("expected existing");
        };
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn unkeyed_jobs_never_collide() {
        let store = MemoryJobStore::new();
        let a = store.create(job(None)).await.unwrap().into_job();
        let b = store.create(job(None)).await.unwrap().into_job();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn terminal_job_is_returned_for_its_key() {
        let store = MemoryJobStore::new();
        let created = store.create(job(Some("idem-1"))).await.unwrap().into_job();
        store.mark_running(created.id).await.unwrap();
        store
            .finish(
                created.id,
                JobStatus::Succeeded,
                success(),
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();

        let resubmitted = store.create(job(Some("idem-1"))).await.unwrap();
        let KeyedInsert::Existing(existing) = resubmitted else {
            panic!("expected memoized job");
        };
        assert_eq!(existing.id, created.id);
        assert_eq!(existing.status, JobStatus::Succeeded);
        assert!(existing.result.is_some());
    }

    #[tokio::test]
    async fn status_moves_only_forward() {
        let store = MemoryJobStore::new();
        let created = store.create(job(None)).await.unwrap().into_job();

        let running = store.mark_running(created.id).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert_eq!(running.attempt, 1);

        // Running again is a state-machine violation.
        assert!(matches!(
            store.mark_running(created.id).await,
            Err(StoreError::InvalidTransition(_))
        ));

        let done = store
            .finish(
                created.id,
                JobStatus::Succeeded,
                success(),
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert!(done.expires_at.is_some());

        // Terminal states are never re-entered.
        assert!(matches!(
            store
                .finish(
                    created.id,
                    JobStatus::Failed,
                    JobOutcome::Failed(JobFailure::new(FailureReason::StoreUnavailable, "late")),
                    Utc::now()
                )
                .await,
            Err(StoreError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn rejected_is_reachable_only_from_queued() {
        let store = MemoryJobStore::new();
        let created = store.create(job(None)).await.unwrap().into_job();
        let rejected = store
            .finish(
                created.id,
                JobStatus::Rejected,
                JobOutcome::Failed(JobFailure::new(FailureReason::ReportTooLarge, "5 MiB blob")),
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, JobStatus::Rejected);
        assert_eq!(rejected.attempt, 0);
    }

    #[tokio::test]
    async fn remove_expired_frees_idempotency_keys() {
        let store = MemoryJobStore::new();
        let created = store.create(job(Some("idem-1"))).await.unwrap().into_job();
        store.mark_running(created.id).await.unwrap();
        store
            .finish(
                created.id,
                JobStatus::Succeeded,
                success(),
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();

        let removed = store.remove_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, vec![created.id]);
        assert!(store.get(created.id).await.unwrap().is_none());

        // The key is free again for a fresh submission.
        let fresh = store.create(job(Some("idem-1"))).await.unwrap();
        assert!(matches!(fresh, KeyedInsert::Created(_)));
    }

    #[tokio::test]
    async fn in_flight_jobs_are_never_reaped() {
        let store = MemoryJobStore::new();
        let queued = store.create(job(None)).await.unwrap().into_job();
        let running = store.create(job(None)).await.unwrap().into_job();
        store.mark_running(running.id).await.unwrap();

        let removed = store
            .remove_expired(Utc::now() + Duration::days(365))
            .await
            .unwrap();
        assert!(removed.is_empty());
        assert!(store.get(queued.id).await.unwrap().is_some());
        assert!(store.get(running.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_running_surfaces_old_jobs() {
        let store = MemoryJobStore::new();
        let created = store.create(job(None)).await.unwrap().into_job();
        store.mark_running(created.id).await.unwrap();

        let stale = store
            .stale_running(Utc::now() + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, created.id);

        let fresh = store
            .stale_running(Utc::now() - Duration::seconds(10))
            .await
            .unwrap();
        assert!(fresh.is_empty());
    }
}
