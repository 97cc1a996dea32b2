//! Settings gateway
//!
//! Thin read/watch wrapper over the persisted key-value configuration.
//! Every mutation goes through [`SettingsStore::update`], which persists
//! the full document and notifies watchers; readers always see the
//! current value, so thresholds changed mid-flight affect in-flight
//! decisions.

use chatveil_core::prompt::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
use chatveil_core::{ModelSpec, PromptTemplates, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Generative model configuration: confidence gate plus editable prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeSettings {
    pub confidence_threshold: f32,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl GenerativeSettings {
    /// Current prompt pair, ready for message building
    pub fn templates(&self) -> PromptTemplates {
        PromptTemplates {
            system: self.system_prompt.clone(),
            user: self.user_prompt.clone(),
        }
    }
}

/// Classifier model configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub score_threshold: f32,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
        }
    }
}

/// Four independent log channels gating the engine's event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilters {
    pub debug: bool,
    pub info: bool,
    pub warn: bool,
    pub error: bool,
}

impl Default for LogFilters {
    fn default() -> Self {
        Self {
            debug: true,
            info: true,
            warn: true,
            error: true,
        }
    }
}

/// The full persisted configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub model: ModelSpec,
    pub generative: GenerativeSettings,
    pub classifier: ClassifierSettings,
    pub log_filters: LogFilters,
    pub max_comment_history: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: ModelSpec::default_generative(),
            generative: GenerativeSettings::default(),
            classifier: ClassifierSettings::default(),
            log_filters: LogFilters::default(),
            max_comment_history: 100,
        }
    }
}

struct StoreInner {
    path: Option<PathBuf>,
    current: RwLock<Settings>,
    notifier: watch::Sender<Settings>,
}

/// Handle to the persisted settings document.
///
/// Cheap to clone; all clones share the same state and watch channel.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

impl SettingsStore {
    /// Volatile store with default values, for tests and dry runs
    pub fn in_memory() -> Self {
        Self::from_settings(Settings::default(), None)
    }

    /// Open (or create) the settings file at `path`.
    ///
    /// A missing file yields defaults; the file is only written on the
    /// first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Settings::default()
        };
        Ok(Self::from_settings(settings, Some(path)))
    }

    fn from_settings(settings: Settings, path: Option<PathBuf>) -> Self {
        let (notifier, _) = watch::channel(settings.clone());
        Self {
            inner: Arc::new(StoreInner {
                path,
                current: RwLock::new(settings),
                notifier,
            }),
        }
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> Settings {
        self.inner.current.read().clone()
    }

    /// Subscribe to settings changes.
    ///
    /// The receiver observes the full document; callers pick out the
    /// fields they care about.
    pub fn watch(&self) -> watch::Receiver<Settings> {
        self.inner.notifier.subscribe()
    }

    /// Apply a mutation, persist, and notify watchers
    pub fn update(&self, mutate: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let updated = {
            let mut current = self.inner.current.write();
            mutate(&mut current);
            current.clone()
        };

        if let Some(path) = &self.inner.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&updated)?)?;
        }

        // Send fails only with no receivers, which is fine.
        let _ = self.inner.notifier.send(updated.clone());
        Ok(updated)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|s| s.enabled = enabled).map(|_| ())
    }

    pub fn set_model(&self, model: ModelSpec) -> Result<()> {
        self.update(|s| s.model = model).map(|_| ())
    }

    pub fn set_confidence_threshold(&self, threshold: f32) -> Result<()> {
        self.update(|s| s.generative.confidence_threshold = threshold)
            .map(|_| ())
    }

    pub fn set_score_threshold(&self, threshold: f32) -> Result<()> {
        self.update(|s| s.classifier.score_threshold = threshold)
            .map(|_| ())
    }

    pub fn set_log_filters(&self, filters: LogFilters) -> Result<()> {
        self.update(|s| s.log_filters = filters).map(|_| ())
    }

    pub fn set_max_comment_history(&self, max: usize) -> Result<()> {
        self.update(|s| s.max_comment_history = max).map(|_| ())
    }
}
