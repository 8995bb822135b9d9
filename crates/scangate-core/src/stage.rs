//! Pipeline stage traits.
//!
//! The worker drives each job through normalize -> score -> evaluate.
//! Each stage is synchronous compute behind a trait so policy and parsing
//! can be swapped (and mocked) independently of the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::finding::{Asset, Finding, ScannerKind, Severity};
use crate::release::{AssetContext, GateDecision, RiskException};

/// Error converting a raw scanner report into findings.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed {tool} report: {message}")]
    Malformed { tool: ScannerKind, message: String },
}

/// Risk attributed to a single open finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingContribution {
    pub finding_id: String,
    pub severity: Severity,
    pub points: f64,
}

/// Output of the risk scorer: the clamped total plus per-finding
/// contributions and the reason/evidence trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub contributions: Vec<FindingContribution>,
    pub reasons: Vec<String>,
    pub evidence: Vec<String>,
}

/// Error from the gate evaluator.
#[derive(Debug, Error)]
#[error("gate evaluation failed: {0}")]
pub struct GateError(pub String);

/// Converts one scanner's raw report into canonical findings.
pub trait Normalizer: Send + Sync {
    fn normalize(
        &self,
        tool: ScannerKind,
        payload: &[u8],
        asset: &Asset,
        evidence_uri: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<Finding>, NormalizeError>;
}

/// Computes a release risk score from the merged finding set.
pub trait RiskScorer: Send + Sync {
    fn score(
        &self,
        release_id: &str,
        findings: &[Finding],
        context: &AssetContext,
        exceptions: &[RiskException],
    ) -> ScoreBreakdown;
}

/// Renders the pass/warn/fail verdict for a scored release.
pub trait GateEvaluator: Send + Sync {
    fn evaluate(
        &self,
        breakdown: &ScoreBreakdown,
        findings: &[Finding],
    ) -> Result<GateDecision, GateError>;
}
