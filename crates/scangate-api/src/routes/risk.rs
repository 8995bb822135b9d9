//! Committed release risk lookup.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use scangate_core::finding::Finding;
use scangate_core::release::GateDecision;

use crate::AppState;
use crate::auth::{self, Permission};
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/release/{id}", get(get_release))
}

#[derive(Debug, Serialize)]
struct RiskReleaseResponse {
    release_id: String,
    version: u64,
    score: f64,
    decision: GateDecision,
    findings: Vec<Finding>,
}

async fn get_release(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<RiskReleaseResponse>, ApiError> {
    auth::require(state.settings.auth_enabled, &headers, Permission::Read)?;
    let release = state
        .releases
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("release_not_found".to_string()))?;
    Ok(Json(RiskReleaseResponse {
        release_id: release.release_id,
        version: release.version,
        score: release.score,
        decision: release.decision,
        findings: release.findings,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use scangate_config::Settings;

    use crate::AppState;

    #[tokio::test]
    async fn unknown_release_is_not_found() {
        let router = crate::routes::router(AppState::in_memory(Settings::default()));
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/risk/release/rel-missing")
                    .header("x-role", "auditor")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
