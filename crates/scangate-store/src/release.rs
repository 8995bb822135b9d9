//! Release store: the committed score/decision snapshot per release.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use scangate_core::finding::Finding;
use scangate_core::release::{GateDecision, Release};

use crate::{StoreError, StoreResult};

/// The value side of a release commit; the store assigns the version.
#[derive(Debug, Clone)]
pub struct ReleaseSnapshot {
    pub score: f64,
    pub decision: GateDecision,
    pub findings: Vec<Finding>,
}

#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn get(&self, release_id: &str) -> StoreResult<Option<Release>>;

    /// Compare-and-set commit. `expected_version` must match the
    /// currently stored version (0 for a release that does not exist
    /// yet); a mismatch returns [`StoreError::VersionConflict`] and
    /// leaves the stored record untouched.
    async fn commit(
        &self,
        release_id: &str,
        expected_version: u64,
        snapshot: ReleaseSnapshot,
    ) -> StoreResult<Release>;
}

/// In-memory release store, the default backend.
#[derive(Default)]
pub struct MemoryReleaseStore {
    releases: Mutex<HashMap<String, Release>>,
}

impl MemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReleaseStore for MemoryReleaseStore {
    async fn get(&self, release_id: &str) -> StoreResult<Option<Release>> {
        let releases = self.releases.lock().expect("release store lock poisoned");
        Ok(releases.get(release_id).cloned())
    }

    async fn commit(
        &self,
        release_id: &str,
        expected_version: u64,
        snapshot: ReleaseSnapshot,
    ) -> StoreResult<Release> {
        let mut releases = self.releases.lock().expect("release store lock poisoned");
        let current_version = releases.get(release_id).map(|r| r.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(StoreError::VersionConflict {
                release_id: release_id.to_string(),
                expected: expected_version,
            });
        }
        let release = Release {
            release_id: release_id.to_string(),
            version: expected_version + 1,
            score: snapshot.score,
            decision: snapshot.decision,
            findings: snapshot.findings,
        };
        releases.insert(release_id.to_string(), release.clone());
        Ok(release)
    }
}

/// PostgreSQL implementation of [`ReleaseStore`].
pub struct PgReleaseStore {
    pool: PgPool,
}

impl PgReleaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReleaseStore for PgReleaseStore {
    async fn get(&self, release_id: &str) -> StoreResult<Option<Release>> {
        let row = sqlx::query(
            "SELECT release_id, version, score, decision, findings FROM releases WHERE release_id = $1",
        )
        .bind(release_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Release {
            release_id: row.get("release_id"),
            version: row.get::<i64, _>("version") as u64,
            score: row.get("score"),
            decision: serde_json::from_value(row.get("decision"))?,
            findings: serde_json::from_value(row.get("findings"))?,
        }))
    }

    async fn commit(
        &self,
        release_id: &str,
        expected_version: u64,
        snapshot: ReleaseSnapshot,
    ) -> StoreResult<Release> {
        let decision = serde_json::to_value(&snapshot.decision)?;
        let findings = serde_json::to_value(&snapshot.findings)?;
        let new_version = expected_version as i64 + 1;

        let result = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO releases (release_id, version, score, decision, findings)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (release_id) DO NOTHING
                "#,
            )
            .bind(release_id)
            .bind(new_version)
            .bind(snapshot.score)
            .bind(&decision)
            .bind(&findings)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE releases
                SET version = $2, score = $3, decision = $4, findings = $5
                WHERE release_id = $1 AND version = $6
                "#,
            )
            .bind(release_id)
            .bind(new_version)
            .bind(snapshot.score)
            .bind(&decision)
            .bind(&findings)
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                release_id: release_id.to_string(),
                expected: expected_version,
            });
        }
        Ok(Release {
            release_id: release_id.to_string(),
            version: expected_version + 1,
            score: snapshot.score,
            decision: snapshot.decision,
            findings: snapshot.findings,
        })
    }
}
