//! Comment history store
//!
//! Append-with-eviction log of analyzed comments. When an insertion would
//! exceed the configured capacity, the single entry with the earliest
//! `analyzed_at` is evicted first. Ids are assigned by the store and never
//! reused; retrieval returns entries in insertion order.

use crate::settings::SettingsStore;
use chatveil_core::{AnalysisResult, CommentHistoryItem, Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    next_id: u64,
    items: Vec<CommentHistoryItem>,
}

struct HistoryInner {
    path: Option<PathBuf>,
    settings: SettingsStore,
    state: RwLock<HistoryFile>,
}

/// Handle to the persisted comment history.
///
/// Cheap to clone; the capacity bound is read from the settings gateway
/// at insertion time, so changing it applies to subsequent writes.
#[derive(Clone)]
pub struct CommentHistory {
    inner: Arc<HistoryInner>,
}

impl CommentHistory {
    /// Volatile store, for tests and dry runs
    pub fn in_memory(settings: SettingsStore) -> Self {
        Self::from_state(HistoryFile::default(), None, settings)
    }

    /// Open (or create) the history file at `path`
    pub fn open(path: impl Into<PathBuf>, settings: SettingsStore) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            HistoryFile::default()
        };
        Ok(Self::from_state(state, Some(path), settings))
    }

    fn from_state(mut state: HistoryFile, path: Option<PathBuf>, settings: SettingsStore) -> Self {
        if state.next_id == 0 {
            state.next_id = 1;
        }
        Self {
            inner: Arc::new(HistoryInner {
                path,
                settings,
                state: RwLock::new(state),
            }),
        }
    }

    /// Append one analyzed comment, evicting the oldest entry first when
    /// the store is at capacity. Returns the stored item with its
    /// assigned id.
    pub fn append(
        &self,
        analyzed_at: DateTime<Utc>,
        comment: impl Into<String>,
        result: AnalysisResult,
    ) -> Result<CommentHistoryItem> {
        let max = self.inner.settings.get().max_comment_history;
        let mut state = self.inner.state.write();

        if state.items.len() >= max {
            let oldest = state
                .items
                .iter()
                .enumerate()
                .min_by_key(|(_, item)| (item.analyzed_at, item.id))
                .map(|(index, _)| index);
            if let Some(index) = oldest {
                let evicted = state.items.remove(index);
                debug!(id = evicted.id, "evicted oldest history entry");
            }
        }

        let item = CommentHistoryItem {
            id: state.next_id,
            analyzed_at,
            comment: comment.into(),
            result,
        };
        state.next_id += 1;
        state.items.push(item.clone());

        self.persist(&state)?;
        Ok(item)
    }

    /// All entries, in store order
    pub fn all(&self) -> Vec<CommentHistoryItem> {
        self.inner.state.read().items.clone()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.state.read().items.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the full history as pretty JSON to `path`; returns the
    /// number of exported entries
    pub fn export(&self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        let items = self.all();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&items)?)?;
        Ok(items.len())
    }

    fn persist(&self, state: &HistoryFile) -> Result<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::history_write(format!("create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string(state)
            .map_err(|e| Error::history_write(format!("serialize history: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| Error::history_write(format!("write {}: {e}", path.display())))
    }
}
