//! Weighted additive risk scoring.

use chrono::Utc;

use scangate_core::finding::{DataClassification, Finding, FindingStatus, Severity};
use scangate_core::release::{AssetContext, EnvironmentKind, RiskException};
use scangate_core::stage::{FindingContribution, RiskScorer, ScoreBreakdown};

/// Maximum total score; larger sums are clamped.
pub const MAX_SCORE: f64 = 100.0;
/// Cap on the per-finding compensating-controls deduction.
const MAX_COMPENSATION: f64 = 30.0;
const INTERNET_FACING_WEIGHT: f64 = 12.0;

fn severity_base(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 45.0,
        Severity::High => 30.0,
        Severity::Medium => 18.0,
        Severity::Low => 8.0,
        Severity::Info => 3.0,
    }
}

fn exposure_weight(environment: EnvironmentKind) -> f64 {
    match environment {
        EnvironmentKind::Prod => 12.0,
        EnvironmentKind::Staging => 6.0,
        EnvironmentKind::Dev => 2.0,
    }
}

fn blast_weight(classification: DataClassification) -> f64 {
    match classification {
        DataClassification::Restricted => 20.0,
        DataClassification::Confidential => 15.0,
        DataClassification::Internal => 8.0,
        DataClassification::Public => 3.0,
    }
}

/// Additive per-finding scoring: severity base + exploitability +
/// exposure + data blast radius, reduced by compensating controls.
/// Approved unexpired exceptions waive their finding entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScorer;

impl WeightedScorer {
    pub fn new() -> Self {
        Self
    }
}

impl RiskScorer for WeightedScorer {
    fn score(
        &self,
        _release_id: &str,
        findings: &[Finding],
        context: &AssetContext,
        exceptions: &[RiskException],
    ) -> ScoreBreakdown {
        let now = Utc::now();
        let mut total = 0.0;
        let mut contributions = Vec::new();
        let mut reasons = Vec::new();
        let mut evidence = Vec::new();

        for finding in findings {
            if finding.status != FindingStatus::Open {
                continue;
            }
            if exceptions.iter().any(|e| e.waives(&finding.id, now)) {
                reasons.push(format!("exception_active:{}", finding.id));
                continue;
            }

            let base = severity_base(finding.severity);
            let exploitability = 20.0 * finding.exploitability;
            let exposure = exposure_weight(context.environment)
                + if context.internet_facing {
                    INTERNET_FACING_WEIGHT
                } else {
                    0.0
                };
            let blast = blast_weight(context.data_classification);
            let deduction = finding.compensating_controls.min(MAX_COMPENSATION);
            let points = (base + exploitability + exposure + blast - deduction).max(0.0);

            total += points;
            contributions.push(FindingContribution {
                finding_id: finding.id.clone(),
                severity: finding.severity,
                points,
            });
            reasons.push(format!("open_{}:{}", finding.severity, finding.id));
            evidence.push(finding.evidence_uri.clone());
        }

        reasons.sort();
        reasons.dedup();
        evidence.sort();
        evidence.dedup();

        ScoreBreakdown {
            score: total.min(MAX_SCORE),
            contributions,
            reasons,
            evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use scangate_core::finding::{Asset, Criticality};

    fn asset() -> Asset {
        Asset {
            repo: "gitlab.example.com/acme/payments".to_string(),
            service: "payments-api".to_string(),
            owner: "payments".to_string(),
            environment: "prod".to_string(),
            criticality: Criticality::Tier1,
            data_classification: DataClassification::Confidential,
        }
    }

    fn finding(id: &str, severity: Severity) -> Finding {
        let now = Utc::now();
        Finding {
            id: id.to_string(),
            source: "gitleaks".to_string(),
            kind: "secret".to_string(),
            severity,
            asset: asset(),
            evidence_uri: format!("https://evidence.local/finding/{id}"),
            first_seen: now,
            last_seen: now,
            status: FindingStatus::Open,
            exploitability: 0.9,
            compensating_controls: 0.0,
        }
    }

    fn prod_context() -> AssetContext {
        AssetContext {
            internet_facing: true,
            environment: EnvironmentKind::Prod,
            data_classification: DataClassification::Confidential,
        }
    }

    #[test]
    fn high_in_prod_scores_high() {
        let breakdown = WeightedScorer::new().score(
            "rel-1",
            &[finding("F-1", Severity::High)],
            &prod_context(),
            &[],
        );
        // 30 + 18 + 24 + 15
        assert_eq!(breakdown.score, 87.0);
        assert_eq!(breakdown.contributions.len(), 1);
        assert_eq!(breakdown.contributions[0].points, 87.0);
        assert_eq!(breakdown.reasons, vec!["open_high:F-1"]);
        assert_eq!(
            breakdown.evidence,
            vec!["https://evidence.local/finding/F-1"]
        );
    }

    #[test]
    fn contributions_keep_the_unclamped_points() {
        let breakdown = WeightedScorer::new().score(
            "rel-1",
            &[finding("F-1", Severity::Critical)],
            &prod_context(),
            &[],
        );
        // 45 + 18 + 24 + 15 per finding; the total clamps.
        assert_eq!(breakdown.contributions[0].points, 102.0);
        assert_eq!(breakdown.score, MAX_SCORE);
    }

    #[test]
    fn total_clamps_at_max() {
        let findings = vec![
            finding("F-1", Severity::Critical),
            finding("F-2", Severity::Critical),
        ];
        let breakdown = WeightedScorer::new().score("rel-1", &findings, &prod_context(), &[]);
        assert_eq!(breakdown.score, MAX_SCORE);
        assert_eq!(breakdown.contributions.len(), 2);
    }

    #[test]
    fn approved_exception_waives_finding() {
        let exception = RiskException {
            finding_id: "F-1".to_string(),
            owner: "arch".to_string(),
            expires_at: Utc::now() + Duration::days(10),
            approved: true,
        };
        let breakdown = WeightedScorer::new().score(
            "rel-1",
            &[finding("F-1", Severity::High)],
            &prod_context(),
            &[exception],
        );
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.contributions.is_empty());
        assert_eq!(breakdown.reasons, vec!["exception_active:F-1"]);
    }

    #[test]
    fn expired_exception_does_not_waive() {
        let exception = RiskException {
            finding_id: "F-1".to_string(),
            owner: "arch".to_string(),
            expires_at: Utc::now() - Duration::days(1),
            approved: true,
        };
        let breakdown = WeightedScorer::new().score(
            "rel-1",
            &[finding("F-1", Severity::High)],
            &prod_context(),
            &[exception],
        );
        assert!(breakdown.score > 0.0);
    }

    #[test]
    fn non_open_findings_are_skipped() {
        let mut resolved = finding("F-1", Severity::Critical);
        resolved.status = FindingStatus::Resolved;
        let breakdown = WeightedScorer::new().score("rel-1", &[resolved], &prod_context(), &[]);
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.reasons.is_empty());
    }

    #[test]
    fn compensating_controls_deduction_is_capped() {
        let mut compensated = finding("F-1", Severity::Critical);
        compensated.compensating_controls = 80.0;
        let breakdown = WeightedScorer::new().score("rel-1", &[compensated], &prod_context(), &[]);
        // 102 - 30 cap, not 102 - 80
        assert_eq!(breakdown.score, 72.0);
    }

    #[test]
    fn low_finding_off_internet_stays_under_warn_threshold() {
        let context = AssetContext {
            internet_facing: false,
            environment: EnvironmentKind::Staging,
            data_classification: DataClassification::Internal,
        };
        let breakdown =
            WeightedScorer::new().score("rel-1", &[finding("F-2", Severity::Low)], &context, &[]);
        // 8 + 18 + 6 + 8
        assert_eq!(breakdown.score, 40.0);
    }
}
