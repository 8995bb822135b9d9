//! gitleaks secret-detection reports.

use chrono::{DateTime, Utc};
use serde_json::Value;

use scangate_core::finding::{Asset, Finding, FindingStatus, Severity};

/// Leaked secrets are always critical and near-certainly exploitable.
pub(crate) fn parse(
    report: &Value,
    asset: &Asset,
    evidence_uri: &str,
    observed_at: DateTime<Utc>,
) -> Vec<Finding> {
    let entries = report
        .get("findings")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .or_else(|| report.get("Leaks").and_then(|v| v.as_array()))
        .map(|a| a.as_slice())
        .unwrap_or_default();

    entries
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let rule_id = item
                .get("RuleID")
                .and_then(|v| v.as_str())
                .unwrap_or("secret");
            let file = item
                .get("File")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let line = item.get("StartLine").and_then(|v| v.as_i64()).unwrap_or(0);
            Finding {
                id: format!("gitleaks-{rule_id}-{idx}"),
                source: "gitleaks".to_string(),
                kind: "secret".to_string(),
                severity: Severity::Critical,
                asset: asset.clone(),
                evidence_uri: format!("{evidence_uri}#{file}:{line}"),
                first_seen: observed_at,
                last_seen: observed_at,
                status: FindingStatus::Open,
                exploitability: 0.95,
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
    fn parses_findings_entries() {
        let report = serde_json::json!({
            "findings": [
                {"RuleID": "generic-api-key", "File": "app/config.py", "StartLine": 22}
            ]
        });
        let findings = parse(
            &report,
            &asset(),
            "https://evidence.local/scans/gitleaks.json",
            Utc::now(),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "gitleaks-generic-api-key-0");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(
            findings[0].evidence_uri,
            "https://evidence.local/scans/gitleaks.json#app/config.py:22"
        );
    }

    #[test]
    fn falls_back_to_legacy_leaks_field() {
        let report = serde_json::json!({
            "Leaks": [{"RuleID": "aws-key", "File": "deploy.sh", "StartLine": 3}]
        });
        let findings = parse(&report, &asset(), "https://e.local/g.json", Utc::now());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "gitleaks-aws-key-0");
    }

    #[test]
    fn empty_report_yields_no_findings() {
        let report = serde_json::json!({});
        assert!(parse(&report, &asset(), "https://e.local/g.json", Utc::now()).is_empty());
    }
}
