//! Release snapshots and gate decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finding::{DataClassification, Finding};

/// Deployment environment a release targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Dev,
    Staging,
    #[default]
    Prod,
}

/// Exposure context used when scoring a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetContext {
    #[serde(default = "default_true")]
    pub internet_facing: bool,
    #[serde(default)]
    pub environment: EnvironmentKind,
    #[serde(default = "default_classification")]
    pub data_classification: DataClassification,
}

impl Default for AssetContext {
    fn default() -> Self {
        Self {
            internet_facing: true,
            environment: EnvironmentKind::Prod,
            data_classification: DataClassification::Internal,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_classification() -> DataClassification {
    DataClassification::Internal
}

/// A time-bounded, approved waiver for a single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskException {
    pub finding_id: String,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
}

impl RiskException {
    /// Whether this exception waives the given finding at `now`.
    pub fn waives(&self, finding_id: &str, now: DateTime<Utc>) -> bool {
        self.finding_id == finding_id && self.approved && self.expires_at > now
    }
}

/// Verdict of the gate evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateResult {
    Pass,
    Warn,
    Fail,
}

impl GateResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateResult::Pass => "pass",
            GateResult::Warn => "warn",
            GateResult::Fail => "fail",
        }
    }
}

impl std::fmt::Display for GateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gate verdict for a release, with supporting reasons and evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub result: GateResult,
    pub score: f64,
    pub reasons: Vec<String>,
    pub evidence: Vec<String>,
    pub policy_version: String,
}

/// The most recently committed score/decision/findings for a release.
///
/// `version` increments on every successful commit and backs the
/// compare-and-set discipline: a commit carrying a stale version is
/// rejected instead of overwriting newer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub release_id: String,
    pub version: u64,
    pub score: f64,
    pub decision: GateDecision,
    pub findings: Vec<Finding>,
}
