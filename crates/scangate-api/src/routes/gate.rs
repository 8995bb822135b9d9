//! Synchronous gate evaluation.
//!
//! Scores and evaluates a supplied finding set without creating a job
//! or committing release state; the committed snapshot is owned by the
//! async pipeline alone.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use scangate_core::finding::Finding;
use scangate_core::release::{AssetContext, GateDecision, RiskException};

use crate::AppState;
use crate::auth::{self, Permission};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/evaluate", post(evaluate))
}

#[derive(Debug, Deserialize)]
struct GateEvaluateRequest {
    release_id: String,
    findings: Vec<Finding>,
    #[serde(default)]
    asset_context: AssetContext,
    #[serde(default)]
    exceptions: Vec<RiskException>,
}

async fn evaluate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GateEvaluateRequest>,
) -> Result<Json<GateDecision>, ApiError> {
    auth::require(state.settings.auth_enabled, &headers, Permission::Evaluate)?;
    let breakdown = state.scorer.score(
        &req.release_id,
        &req.findings,
        &req.asset_context,
        &req.exceptions,
    );
    let decision = state
        .gate
        .evaluate(&breakdown, &req.findings)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(decision))
}
