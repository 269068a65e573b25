//! Last-known view state persistence.
//!
//! Every dashboard view keeps its most recent canonical view in a durable
//! key-value store so a restart can redisplay it before any live data has
//! arrived. The cache is never expired; stale entries are still shown, just
//! labelled as "last known".
//!
//! Loading never fails: a missing, unreadable or corrupt entry is a cache
//! miss and the view simply starts empty.

use crate::error::{DashboardError, Result};
use crate::telemetry::Sample;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix shared by every cache entry.
pub const KEY_PREFIX: &str = "weathertech_";

/// Synchronous string-keyed storage surviving restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One JSON file per key under a data directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Write to a sibling file first so a crash never leaves half a cache entry
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }
}

/// Process-local store, used for tests and `--no-cache` runs.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Persisted canonical view of one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedViewState {
    /// Displayed sample (already merged across partial updates)
    pub latest: Sample,
    /// Chronological history, empty for views that only cache the latest sample
    #[serde(default)]
    pub history: Vec<Sample>,
    pub saved_at: DateTime<Utc>,
}

/// Load/save of [`CachedViewState`] namespaced per view.
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key_for(view_key: &str) -> String {
        format!("{}{}", KEY_PREFIX, view_key)
    }

    /// Overwrite the cached state of a view.
    pub fn save(&self, view_key: &str, state: &CachedViewState) -> Result<()> {
        let data = serde_json::to_string(state)?;
        self.store
            .set(&Self::key_for(view_key), &data)
            .map_err(|e| DashboardError::Persistence(format!("{}: {}", view_key, e)))?;
        debug!(
            "[Cache] Saved '{}' ({} history samples)",
            view_key,
            state.history.len()
        );
        Ok(())
    }

    /// Previously saved state, or `None`. Corrupt entries count as absent.
    pub fn load(&self, view_key: &str) -> Option<CachedViewState> {
        let key = Self::key_for(view_key);
        match self.store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<CachedViewState>(&raw) {
                Ok(state) => {
                    info!(
                        "[Cache] Loaded last known state for '{}' (saved {})",
                        view_key, state.saved_at
                    );
                    Some(state)
                }
                Err(e) => {
                    warn!("[Cache] Ignoring corrupt entry for '{}': {}", view_key, e);
                    None
                }
            },
            Ok(None) => {
                info!("[Cache] No cached state for '{}' (first run)", view_key);
                None
            }
            Err(e) => {
                error!("[Cache] Failed to read entry for '{}': {}", view_key, e);
                None
            }
        }
    }
}
