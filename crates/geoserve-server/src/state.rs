//! Application state shared across handlers.

use std::sync::Arc;

use geoserve_process::{ExecutionEngine, ProcessRegistry};
use geoserve_session::SessionManager;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Resolves process identifiers.
    pub registry: ProcessRegistry,

    /// Runs jobs and tracks them for polling.
    pub engine: ExecutionEngine,

    /// Per-token session sandboxes.
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        registry: ProcessRegistry,
        engine: ExecutionEngine,
        sessions: SessionManager,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            engine,
            sessions,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
