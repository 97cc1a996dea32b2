//! Channel-filtered engine log
//!
//! The engine's event log routes through four user-toggleable channels on
//! top of `tracing` levels, updated live from the settings watch.

use chatveil_store::LogFilters;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Filterable logger for engine events; cheap to clone
#[derive(Clone)]
pub struct EngineLog {
    filters: Arc<RwLock<LogFilters>>,
}

impl EngineLog {
    pub fn new(filters: LogFilters) -> Self {
        Self {
            filters: Arc::new(RwLock::new(filters)),
        }
    }

    /// Replace the active channel filters
    pub fn set_filters(&self, filters: LogFilters) {
        *self.filters.write() = filters;
    }

    pub fn filters(&self) -> LogFilters {
        *self.filters.read()
    }

    pub fn debug(&self, message: impl std::fmt::Display) {
        if self.filters.read().debug {
            debug!(target: "chatveil", "{message}");
        }
    }

    pub fn info(&self, message: impl std::fmt::Display) {
        if self.filters.read().info {
            info!(target: "chatveil", "{message}");
        }
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        if self.filters.read().warn {
            warn!(target: "chatveil", "{message}");
        }
    }

    pub fn error(&self, message: impl std::fmt::Display) {
        if self.filters.read().error {
            error!(target: "chatveil", "{message}");
        }
    }
}

impl Default for EngineLog {
    fn default() -> Self {
        Self::new(LogFilters::default())
    }
}
