//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use crate::config::Config;
use crate::project::ProjectManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// The orchestrating project manager
    pub manager: Arc<dyn ProjectManager>,

    /// Application configuration
    pub config: Config,
}

impl AppState {
    /// Create a new application state
    pub fn new(manager: Arc<dyn ProjectManager>, config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner { manager, config }),
        }
    }

    /// Get a reference to the project manager
    pub fn manager(&self) -> &Arc<dyn ProjectManager> {
        &self.inner.manager
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
