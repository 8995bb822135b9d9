//! osv-scanner dependency vulnerability reports.

use chrono::{DateTime, Utc};
use serde_json::Value;

use scangate_core::finding::{Asset, Finding, FindingStatus};

use crate::severity;

pub(crate) fn parse(
    report: &Value,
    asset: &Asset,
    evidence_uri: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Finding> {
    let results = report
        .get("results")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    let mut findings = Vec::new();
    for (res_idx, result) in results.iter().enumerate() {
        let pkg_name = result
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let vulns = result
            .get("vulnerabilities")
            .and_then(|v| v.as_array())
            .map(|a| a.as_slice())
            .unwrap_or_default();
        for (vul_idx, vuln) in vulns.iter().enumerate() {
            let vuln_id = vuln.get("id").and_then(|v| v.as_str()).unwrap_or("osv-vuln");
            let sev = severity::from_cvss(cvss_score(vuln));
            findings.push(Finding {
                id: format!("osv-{vuln_id}-{res_idx}-{vul_idx}"),
                source: "osv".to_string(),
                kind: "dependency_vulnerability".to_string(),
                severity: sev,
                asset: asset.clone(),
                evidence_uri: format!("{evidence_uri}#{pkg_name}:{vuln_id}"),
                first_seen: observed_at,
                last_seen: observed_at,
                status: FindingStatus::Open,
                exploitability: 0.65,
                compensating_controls: 0.0,
            });
        }
    }
    findings
}

/// OSV severity entries carry scores like "7.5" or "CVSS:3.1/AV:N/...";
/// only the leading numeric component is meaningful here.
fn cvss_score(vuln: &Value) -> Option<f64> {
    let scores = vuln.get("severity").and_then(|v| v.as_array())?;
    let raw = scores.first()?.get("score")?;
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    text.split('/').next()?.parse().ok()
}
