//! Application state management

use paddock_core::{EngineConfig, SessionSource};
use std::sync::Arc;

/// Shared application state
///
/// Both members are read-only after startup, so handlers never lock.
#[derive(Clone)]
pub struct AppState {
    /// Upstream provider of session tables
    pub source: Arc<dyn SessionSource>,

    /// Engine policy applied to every summary
    pub engine: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(source: Arc<dyn SessionSource>, engine: EngineConfig) -> Self {
        Self {
            source,
            engine: Arc::new(engine),
        }
    }

    /// State backed by the demo source with default engine settings
    pub fn demo() -> Self {
        Self::new(Arc::new(paddock_sources::DemoSource::new()), EngineConfig::default())
    }
}
