//! Application state shared across routes

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::game::{ArenaHandle, GeometryCatalog};
use crate::ws::PresenceRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
    pub catalog: Arc<GeometryCatalog>,
    pub presence: Arc<PresenceRegistry>,
    /// Flips to true once the server starts shutting down
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        arena: ArenaHandle,
        catalog: Arc<GeometryCatalog>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            arena,
            catalog,
            presence: Arc::new(PresenceRegistry::new()),
            shutdown,
        }
    }
}
