//! Application state.

use std::sync::Arc;

use picvid_jobs::{InMemoryJobRegistry, JobRegistry};
use picvid_worker::{SlideshowOrchestrator, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<dyn JobRegistry>,
    pub orchestrator: Arc<SlideshowOrchestrator>,
}

impl AppState {
    /// Create state with a fresh in-memory registry and the default pipeline.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> Self {
        let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
        let orchestrator = SlideshowOrchestrator::new(worker_config, Arc::clone(&registry));
        Self::with_orchestrator(config, orchestrator)
    }

    /// Create state around an already configured orchestrator.
    pub fn with_orchestrator(config: ApiConfig, orchestrator: SlideshowOrchestrator) -> Self {
        Self {
            config,
            registry: Arc::clone(orchestrator.registry()),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
