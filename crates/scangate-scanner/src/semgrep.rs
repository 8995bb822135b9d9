//! semgrep static-analysis reports.

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
    let entries = report
        .get("results")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    entries
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let sev = severity::from_text(
                item.get("extra")
                    .and_then(|e| e.get("severity"))
                    .and_then(|v| v.as_str()),
                Severity::Medium,
            );
            let path = item
                .get("path")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let line = item
                .get("start")
                .and_then(|s| s.get("line"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            let check_id = item
                .get("check_id")
                .and_then(|v| v.as_str())
                .unwrap_or("semgrep-check");
            Finding {
                id: format!("semgrep-{check_id}-{idx}"),
                source: "semgrep".to_string(),
                kind: "code_pattern".to_string(),
                severity: sev,
                asset: asset.clone(),
                evidence_uri: format!("{evidence_uri}#{path}:{line}"),
                first_seen: observed_at,
                last_seen: observed_at,
                status: FindingStatus::Open,
                exploitability: 0.6,
                compensating_controls: 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::asset;

    #[test]
    fn maps_error_severity_to_high() {
        let report = serde_json::json!({
            "results": [{
                "check_id": "python.lang.security.audit.eval-detected",
                "path": "src/main.py",
                "start": {"line": 15},
                "extra": {"severity": "ERROR"}
            }]
        });
        let findings = parse(
            &report,
            &asset(),
            "https://evidence.local/scans/semgrep.json",
            Utc::now(),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].id,
            "semgrep-python.lang.security.audit.eval-detected-0"
        );
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(
            findings[0].evidence_uri,
            "https://evidence.local/scans/semgrep.json#src/main.py:15"
        );
    }

    #[test]
    fn missing_severity_defaults_to_medium() {
        let report = serde_json::json!({"results": [{"path": "a.py"}]});
        let findings = parse(&report, &asset(), "https://e.local/s.json", Utc::now());
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
