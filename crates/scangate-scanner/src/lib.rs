//! Scanner report normalization.
//!
//! Each supported scanner emits its own JSON report shape; the adapters
//! here convert them into canonical [`Finding`]s. Adapters are lenient
//! about missing fields (a scanner upgrade should degrade a finding, not
//! drop the batch) but reject payloads that are not valid JSON.

mod checkov;
mod gitleaks;
mod grype;
mod osv;
mod semgrep;
mod severity;

use chrono::{DateTime, Utc};
use serde_json::Value;

use scangate_core::finding::{Asset, Finding, ScannerKind};
use scangate_core::stage::{NormalizeError, Normalizer};

/// [`Normalizer`] over the built-in scanner adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScannerNormalizer;

impl ScannerNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for ScannerNormalizer {
    fn normalize(
        &self,
        tool: ScannerKind,
        payload: &[u8],
        asset: &Asset,
        evidence_uri: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<Finding>, NormalizeError> {
        let report: Value =
            serde_json::from_slice(payload).map_err(|e| NormalizeError::Malformed {
                tool,
                message: e.to_string(),
            })?;
        if !report.is_object() {
            return Err(NormalizeError::Malformed {
                tool,
                message: "report root is not a JSON object".to_string(),
            });
        }

        let findings = match tool {
            ScannerKind::Gitleaks => gitleaks::parse(&report, asset, evidence_uri, observed_at),
            ScannerKind::Semgrep => semgrep::parse(&report, asset, evidence_uri, observed_at),
            ScannerKind::Checkov => checkov::parse(&report, asset, evidence_uri, observed_at),
            ScannerKind::Grype => grype::parse(&report, asset, evidence_uri, observed_at),
            ScannerKind::Osv => osv::parse(&report, asset, evidence_uri, observed_at),
        };
        Ok(findings)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use scangate_core::finding::Severity;

    #[test]
    fn rejects_invalid_json() {
        let err = ScannerNormalizer::new()
            .normalize(
                ScannerKind::Gitleaks,
                b"not json",
                &testutil::asset(),
                "https://evidence.local/scan.json",
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Malformed {
                tool: ScannerKind::Gitleaks,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_object_root() {
        let err = ScannerNormalizer::new()
            .normalize(
                ScannerKind::Semgrep,
                b"[1, 2, 3]",
                &testutil::asset(),
                "https://evidence.local/scan.json",
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Malformed { .. }));
    }

    #[test]
    fn dispatches_by_scanner_kind() {
        let payload = br#"{"findings": [{"RuleID": "generic-api-key", "File": "app/config.py", "StartLine": 22}]}"#;
        let findings = ScannerNormalizer::new()
            .normalize(
                ScannerKind::Gitleaks,
                payload,
                &testutil::asset(),
                "https://evidence.local/scans/gitleaks.json",
                Utc::now(),
            )
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].source, "gitleaks");
        assert_eq!(findings[0].kind, "secret");
        assert_eq!(findings[0].severity, Severity::Critical);
    }
}
