//! Application state.

use std::sync::Arc;

use scangate_config::Settings;
use scangate_core::evidence::EvidenceStore;
use scangate_core::stage::{GateEvaluator, RiskScorer};
use scangate_risk::{ThresholdGate, WeightedScorer};
use scangate_scanner::ScannerNormalizer;
use scangate_scheduler::{PipelineStages, Scheduler, SchedulerConfig};
use scangate_store::{JobStore, MemoryEvidenceStore, MemoryJobStore, MemoryReleaseStore, ReleaseStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub scheduler: Arc<Scheduler>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub releases: Arc<dyn ReleaseStore>,
    pub scorer: Arc<dyn RiskScorer>,
    pub gate: Arc<dyn GateEvaluator>,
}

impl AppState {
    /// Wire the scheduler and pipeline stages over the given stores.
    pub fn new(
        settings: Settings,
        jobs: Arc<dyn JobStore>,
        releases: Arc<dyn ReleaseStore>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> Self {
        let scorer: Arc<dyn RiskScorer> = Arc::new(WeightedScorer::new());
        let gate: Arc<dyn GateEvaluator> = Arc::new(ThresholdGate::new());
        let stages = PipelineStages {
            evidence: evidence.clone(),
            normalizer: Arc::new(ScannerNormalizer::new()),
            scorer: scorer.clone(),
            gate: gate.clone(),
        };
        let scheduler = Arc::new(Scheduler::start(
            SchedulerConfig::from_settings(&settings),
            jobs,
            releases.clone(),
            stages,
        ));
        Self {
            settings: Arc::new(settings),
            scheduler,
            evidence,
            releases,
            scorer,
            gate,
        }
    }

    /// State backed entirely by in-memory stores.
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(
            settings,
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryReleaseStore::new()),
            Arc::new(MemoryEvidenceStore::new()),
        )
    }
}
