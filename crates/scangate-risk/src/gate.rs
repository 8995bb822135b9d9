//! Threshold gate policy.

use scangate_core::finding::Finding;
use scangate_core::release::{GateDecision, GateResult};
use scangate_core::stage::{GateError, GateEvaluator, ScoreBreakdown};

pub const POLICY_VERSION: &str = "warn-only-v1";

/// Gate verdict by score threshold.
///
/// The default policy is warn-only: releases never hard-fail, matching a
/// rollout phase where the gate advises rather than blocks. Deployments
/// that want a blocking gate set `fail_at`.
#[derive(Debug, Clone)]
pub struct ThresholdGate {
    pub warn_at: f64,
    pub fail_at: Option<f64>,
    pub policy_version: String,
}

impl ThresholdGate {
    pub fn new() -> Self {
        Self {
            warn_at: 50.0,
            fail_at: None,
            policy_version: POLICY_VERSION.to_string(),
        }
    }

    /// A blocking variant that fails releases at or above `fail_at`.
    pub fn with_fail_threshold(fail_at: f64) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new()
        }
    }
}

impl Default for ThresholdGate {
    fn default() -> Self {
        Self::new()
    }
}

impl GateEvaluator for ThresholdGate {
    fn evaluate(
        &self,
        breakdown: &ScoreBreakdown,
        _findings: &[Finding],
    ) -> Result<GateDecision, GateError> {
        let score = (breakdown.score * 100.0).round() / 100.0;
        let mut reasons = breakdown.reasons.clone();

        let result = match self.fail_at {
            Some(fail_at) if score >= fail_at => {
                if reasons.is_empty() {
                    reasons.push("fail_threshold_reached".to_string());
                }
                GateResult::Fail
            }
            _ if score >= self.warn_at => {
                if reasons.is_empty() {
                    reasons.push("warn_threshold_reached".to_string());
                }
                GateResult::Warn
            }
            _ => {
                if reasons.is_empty() {
                    reasons.push("no_open_risks".to_string());
                }
                GateResult::Pass
            }
        };

        Ok(GateDecision {
            result,
            score,
            reasons,
            evidence: breakdown.evidence.clone(),
            policy_version: self.policy_version.clone(),
        })
    }
}
