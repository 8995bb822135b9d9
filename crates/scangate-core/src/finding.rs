//! Canonical findings produced by scanner normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a normalized finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a finding. Only `open` findings contribute risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    #[default]
    Open,
    Resolved,
    Accepted,
}

/// Supported scanner report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    Gitleaks,
    Semgrep,
    Checkov,
    Grype,
    Osv,
}

impl ScannerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerKind::Gitleaks => "gitleaks",
            ScannerKind::Semgrep => "semgrep",
            ScannerKind::Checkov => "checkov",
            ScannerKind::Grype => "grype",
            ScannerKind::Osv => "osv",
        }
    }
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScannerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "gitleaks" => Ok(ScannerKind::Gitleaks),
            "semgrep" => Ok(ScannerKind::Semgrep),
            "checkov" => Ok(ScannerKind::Checkov),
            "grype" => Ok(ScannerKind::Grype),
            "osv" => Ok(ScannerKind::Osv),
            other => Err(format!("unsupported scanner: {other}")),
        }
    }
}

/// Business criticality tier of the scanned asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Tier0,
    Tier1,
    Tier2,
    Tier3,
}

/// Classification of the data the asset handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataClassification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

/// The repository/service a scanner report was produced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub repo: String,
    pub service: String,
    pub owner: String,
    pub environment: String,
    pub criticality: Criticality,
    pub data_classification: DataClassification,
}

/// A normalized vulnerability/weakness record.
///
/// Produced by the normalizer, consumed by the risk scorer and gate
/// evaluator. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    /// Scanner that produced the finding.
    pub source: String,
    /// Category of the weakness (secret, code_pattern, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub asset: Asset,
    pub evidence_uri: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub status: FindingStatus,
    /// Likelihood the finding is exploitable, 0.0..=1.0.
    #[serde(default = "default_exploitability")]
    pub exploitability: f64,
    /// Score deduction for compensating controls, 0.0..=100.0.
    #[serde(default)]
    pub compensating_controls: f64,
}

fn default_exploitability() -> f64 {
    0.5
}
