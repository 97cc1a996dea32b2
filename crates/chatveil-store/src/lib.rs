//! Chatveil Store
//!
//! External persistence consumed by the pipeline through narrow contracts:
//! - the settings gateway: typed read/write/watch access to the persisted
//!   configuration (enable flag, selected model, thresholds, log filters,
//!   history capacity)
//! - the comment history store: append-with-eviction log of every
//!   analyzed comment

pub mod history;
pub mod settings;

pub use history::CommentHistory;
pub use settings::{
    ClassifierSettings, GenerativeSettings, LogFilters, Settings, SettingsStore,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::history::CommentHistory;
    pub use crate::settings::{Settings, SettingsStore};
}

/// Default data directory for settings and history files
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chatveil")
}
