//! Risk scoring and gate policy.
//!
//! [`WeightedScorer`] turns a merged finding set into a 0..=100 risk
//! score with per-finding contributions; [`ThresholdGate`] renders the
//! pass/warn/fail verdict from that score.

pub mod gate;
pub mod score;

pub use gate::ThresholdGate;
pub use score::WeightedScorer;
