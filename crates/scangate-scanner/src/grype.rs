//! grype container/dependency vulnerability reports.

use chrono::{DateTime, Utc};
use serde_json::Value;

use scangate_core::finding::{Asset, Finding, FindingStatus, Severity};

use crate::severity;

pub(crate) fn parse(
    report: &Value,
    asset: &Asset,
    evidence_uri: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Finding> {
    let matches = report
        .get("matches")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    matches
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let vuln = item.get("vulnerability");
            let artifact = item.get("artifact");
            let vuln_id = vuln
                .and_then(|v| v.get("id"))
                .and_then(|v| v.as_str())
                .unwrap_or("grype-vuln");
            let sev = severity::from_text(
                vuln.and_then(|v| v.get("severity")).and_then(|v| v.as_str()),
                Severity::Medium,
            );
            let pkg = artifact
                .and_then(|a| a.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let version = artifact
                .and_then(|a| a.get("version"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            Finding {
                id: format!("grype-{vuln_id}-{idx}"),
                source: "grype".to_string(),
                kind: "dependency_vulnerability".to_string(),
                severity: sev,
                asset: asset.clone(),
                evidence_uri: format!("{evidence_uri}#{pkg}:{version}"),
                first_seen: observed_at,
                last_seen: observed_at,
                status: FindingStatus::Open,
                exploitability: 0.7,
                compensating_controls: 0.0,
            }
        })
        .collect()
}
