//! checkov infrastructure-as-code reports.

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
    let failed = report
        .get("results")
        .and_then(|r| r.get("failed_checks"))
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    failed
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let sev = severity::from_text(
                item.get("severity").and_then(|v| v.as_str()),
                Severity::Medium,
            );
            let check_id = item
                .get("check_id")
                .and_then(|v| v.as_str())
                .unwrap_or("checkov-check");
            let path = item
                .get("file_path")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            Finding {
                id: format!("checkov-{check_id}-{idx}"),
                source: "checkov".to_string(),
                kind: "iac_misconfig".to_string(),
                severity: sev,
                asset: asset.clone(),
                evidence_uri: format!("{evidence_uri}#{path}"),
                first_seen: observed_at,
                last_seen: observed_at,
                status: FindingStatus::Open,
                exploitability: 0.5,
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
    fn parses_failed_checks() {
        let report = serde_json::json!({
            "results": {
                "failed_checks": [
                    {"check_id": "CKV_AWS_20", "file_path": "terraform/main.tf", "severity": "HIGH"}
                ]
            }
        });
        let findings = parse(
            &report,
            &asset(),
            "https://evidence.local/scans/checkov.json",
            Utc::now(),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "checkov-CKV_AWS_20-0");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].kind, "iac_misconfig");
    }

    #[test]
    fn passed_only_report_yields_no_findings() {
        let report = serde_json::json!({"results": {"passed_checks": [{"check_id": "CKV_1"}]}});
        assert!(parse(&report, &asset(), "https://e.local/c.json", Utc::now()).is_empty());
    }
}
