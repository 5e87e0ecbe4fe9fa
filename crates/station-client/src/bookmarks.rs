// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persisted bookmark set.
//!
//! The in-memory list is the source of truth for the session. Every
//! mutation is followed by a full-set save; a failed save is logged and
//! never rolls the mutation back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, warn};
use thiserror::Error;

use crate::registry::StationId;

/// Errors from a bookmark storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bookmark storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("bookmark data is not a list of station ids: {0}")]
    Format(#[from] serde_json::Error),

    #[error("bookmark storage unavailable: {0}")]
    Unavailable(String),
}

/// Where bookmark ids are persisted between sessions.
pub trait BookmarkStorage: Send {
    /// Load the persisted ids in insertion order. Missing data is an empty list.
    fn load(&self) -> Result<Vec<StationId>, StorageError>;

    /// Replace the persisted ids with `ids`.
    fn save(&mut self, ids: &[StationId]) -> Result<(), StorageError>;
}

/// Bookmarks stored as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/weather-station/bookmarks.json`, if the platform has a data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("weather-station").join("bookmarks.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BookmarkStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<StationId>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, ids: &[StationId]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(ids)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    ids: Vec<StationId>,
    saves: usize,
    failing: bool,
}

/// In-memory storage with a shared handle, for ephemeral sessions.
///
/// Clones share the same backing data, so a caller can keep one handle and
/// hand another to the [`BookmarkStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ids(ids: &[StationId]) -> Self {
        let storage = Self::new();
        storage.lock().ids = ids.to_vec();
        storage
    }

    /// Currently persisted ids.
    #[must_use]
    pub fn persisted(&self) -> Vec<StationId> {
        self.lock().ids.clone()
    }

    /// Number of save calls received, successful or not.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// Make subsequent saves fail, as a full or disabled store would.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookmarkStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<StationId>, StorageError> {
        Ok(self.lock().ids.clone())
    }

    fn save(&mut self, ids: &[StationId]) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.saves += 1;
        if inner.failing {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        inner.ids = ids.to_vec();
        Ok(())
    }
}

/// Ordered, deduplicated set of bookmarked station ids.
pub struct BookmarkStore {
    ids: Vec<StationId>,
    storage: Box<dyn BookmarkStorage>,
}

impl std::fmt::Debug for BookmarkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookmarkStore")
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl BookmarkStore {
    /// Load the persisted set. Unreadable or corrupt data yields an empty set.
    pub fn open(storage: Box<dyn BookmarkStorage>) -> Self {
        let loaded = storage.load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable bookmarks: {}", e);
            Vec::new()
        });

        let mut ids: Vec<StationId> = Vec::with_capacity(loaded.len());
        for id in loaded {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        debug!("Loaded {} bookmarks", ids.len());
        Self { ids, storage }
    }

    #[must_use]
    pub fn contains(&self, id: StationId) -> bool {
        self.ids.contains(&id)
    }

    /// Bookmarked ids in insertion order.
    #[must_use]
    pub fn list(&self) -> &[StationId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Remove `id` if present, otherwise append it. Returns the new membership.
    pub fn toggle(&mut self, id: StationId) -> bool {
        let bookmarked = if let Some(position) = self.ids.iter().position(|&b| b == id) {
            self.ids.remove(position);
            false
        } else {
            self.ids.push(id);
            true
        };
        self.persist();
        bookmarked
    }

    /// Remove `id`. Returns whether it was bookmarked.
    pub fn remove(&mut self, id: StationId) -> bool {
        let Some(position) = self.ids.iter().position(|&b| b == id) else {
            return false;
        };
        self.ids.remove(position);
        self.persist();
        true
    }

    fn persist(&mut self) {
        if let Err(e) = self.storage.save(&self.ids) {
            error!("Failed to save bookmarks: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_membership() {
        let storage = MemoryStorage::new();
        let mut store = BookmarkStore::open(Box::new(storage.clone()));

        assert!(store.toggle(StationId(7)));
        assert!(store.contains(StationId(7)));
        assert!(!store.toggle(StationId(7)));
        assert!(!store.contains(StationId(7)));

        assert_eq!(storage.saves(), 2);
        assert!(storage.persisted().is_empty());
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let mut store = BookmarkStore::open(Box::new(MemoryStorage::new()));
        store.toggle(StationId(3));
        store.toggle(StationId(1));
        store.toggle(StationId(2));
        assert_eq!(store.list(), &[StationId(3), StationId(1), StationId(2)]);
    }

    #[test]
    fn test_open_deduplicates() {
        let storage = MemoryStorage::with_ids(&[StationId(4), StationId(5), StationId(4)]);
        let store = BookmarkStore::open(Box::new(storage));
        assert_eq!(store.list(), &[StationId(4), StationId(5)]);
    }

    #[test]
    fn test_failed_save_keeps_in_memory_change() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let mut store = BookmarkStore::open(Box::new(storage.clone()));

        assert!(store.toggle(StationId(9)));
        assert!(store.contains(StationId(9)));
        assert_eq!(storage.saves(), 1);
        assert!(storage.persisted().is_empty());
    }

    #[test]
    fn test_remove_missing_does_not_persist() {
        let storage = MemoryStorage::new();
        let mut store = BookmarkStore::open(Box::new(storage.clone()));
        assert!(!store.remove(StationId(1)));
        assert_eq!(storage.saves(), 0);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("bookmarks.json"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_storage_corrupt_data_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        fs::write(&path, "{not json").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.load(), Err(StorageError::Format(_))));

        let store = BookmarkStore::open(Box::new(storage));
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_storage_save_of_load_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        let mut storage = JsonFileStorage::new(&path);
        storage.save(&[StationId(2), StationId(11)]).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let loaded = storage.load().unwrap();
        storage.save(&loaded).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(storage.load().unwrap(), vec![StationId(2), StationId(11)]);
    }
}
