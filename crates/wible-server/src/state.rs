//! Application state shared across handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use wible_core::Orchestrator;

/// Handle to the state every handler receives.
pub type SharedState = Arc<AppState>;

/// Shared application state.
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    started_at: Instant,
}

impl AppState {
    /// Wrap a (typically already started) orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> SharedState {
        Arc::new(Self {
            orchestrator,
            started_at: Instant::now(),
        })
    }

    /// The scan orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Time since the state was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
