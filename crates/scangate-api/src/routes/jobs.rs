//! Async batch-ingest job endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scangate_core::JobId;
use scangate_core::finding::{Asset, ScannerKind};
use scangate_core::job::{Job, JobOutcome, JobStatus, ReportRef};
use scangate_core::release::{AssetContext, RiskException};
use scangate_scheduler::{BatchSubmission, SubmitError};

use crate::AppState;
use crate::auth::{self, Permission};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scanner/batch", post(submit_batch))
        .route("/{id}", get(get_job))
}

#[derive(Debug, Deserialize)]
struct ScannerReportRequest {
    tool: ScannerKind,
    asset: Asset,
    report: serde_json::Value,
    evidence_uri: String,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct BatchJobRequest {
    release_id: String,
    reports: Vec<ScannerReportRequest>,
    #[serde(default)]
    asset_context: AssetContext,
    #[serde(default)]
    exceptions: Vec<RiskException>,
}

#[derive(Debug, Serialize)]
struct JobStatusResponse {
    job_id: String,
    release_id: String,
    status: JobStatus,
    attempt: u32,
    idempotency_key: Option<String>,
    result: Option<JobOutcome>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            release_id: job.release_id,
            status: job.status,
            attempt: job.attempt,
            idempotency_key: job.idempotency_key,
            result: job.result,
            created_at: job.created_at,
            updated_at: job.updated_at,
            expires_at: job.expires_at,
        }
    }
}

async fn submit_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchJobRequest>,
) -> Result<(StatusCode, Json<JobStatusResponse>), ApiError> {
    auth::require(state.settings.auth_enabled, &headers, Permission::Ingest)?;
    if req.reports.is_empty() {
        return Err(ApiError::BadRequest(
            "batch requires at least one report".to_string(),
        ));
    }
    if req.reports.len() > state.settings.max_reports_per_job {
        return Err(ApiError::Rejected(SubmitError::TooManyReports {
            count: req.reports.len(),
            limit: state.settings.max_reports_per_job,
        }));
    }

    // Store each raw payload before enqueueing so the job carries only
    // evidence references. Oversize payloads are refused without being
    // stored.
    let mut reports = Vec::with_capacity(req.reports.len());
    for (index, report) in req.reports.into_iter().enumerate() {
        let payload = serde_json::to_vec(&report.report)
            .map_err(|e| ApiError::BadRequest(format!("unserializable report: {e}")))?;
        let size_bytes = payload.len() as u64;
        if size_bytes > state.settings.max_report_bytes {
            return Err(ApiError::Rejected(SubmitError::ReportTooLarge {
                index,
                size: size_bytes,
                limit: state.settings.max_report_bytes,
            }));
        }
        let evidence_key = state.evidence.put(Bytes::from(payload)).await?;
        reports.push(ReportRef {
            tool: report.tool,
            evidence_key,
            size_bytes,
            evidence_uri: report.evidence_uri,
            asset: report.asset,
            observed_at: report.observed_at,
        });
    }

    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let submission = state
        .scheduler
        .submit(BatchSubmission {
            release_id: req.release_id,
            reports,
            context: req.asset_context,
            exceptions: req.exceptions,
            idempotency_key,
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(submission.into_job().into())))
}

async fn get_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    auth::require(state.settings.auth_enabled, &headers, Permission::Read)?;
    let job = state
        .scheduler
        .job(JobId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("job_not_found".to_string()))?;
    Ok(Json(job.into()))
}
