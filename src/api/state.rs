use std::sync::Arc;

use crate::config::EngineSettings;
use crate::db::{InMemoryProfileStore, ProfileStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub settings: EngineSettings,
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(EngineSettings::default())
    }
}

impl AppState {
    pub fn new(store: Arc<dyn ProfileStore>, settings: EngineSettings) -> Self {
        Self { store, settings }
    }

    /// State backed by a fresh process-local profile store
    pub fn in_memory(settings: EngineSettings) -> Self {
        Self::new(Arc::new(InMemoryProfileStore::new()), settings)
    }
}
