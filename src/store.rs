//! Project persistence ports.
//!
//! The studio talks to storage only through [`ProjectStore`]. A remote
//! backend and the local cache are both implementations of it.

use crate::neck::ProjectRecord;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Failure reported by a project store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Loads and saves project records.
pub trait ProjectStore {
    /// Returns the most recently saved record, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or its content is
    /// unreadable
    fn load_last(&self) -> Result<Option<ProjectRecord>, StoreError>;

    /// Persists a record, replacing any earlier version with the same id.
    ///
    /// # Errors
    ///
    /// Returns error if the record could not be written
    fn save(&mut self, record: &ProjectRecord) -> Result<(), StoreError>;
}

/// Store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for JsonFileStore {
    fn load_last(&self) -> Result<Option<ProjectRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(ProjectRecord::load_from_file(&self.path)?))
    }

    fn save(&mut self, record: &ProjectRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        record.save_to_file(&self.path)?;
        tracing::debug!(path = %self.path.display(), id = %record.id, "Saved project record");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<ProjectRecord>,
    failing: bool,
    saves: usize,
}

/// In-memory store.
///
/// Clones share the same state, so a handle kept outside the studio can
/// observe what was saved. A failing store rejects every call.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `record`.
    pub fn with_record(record: ProjectRecord) -> Self {
        let store = Self::new();
        store.lock().records.push(record);
        store
    }

    /// Creates a store that rejects every load and save.
    pub fn failing() -> Self {
        let store = Self::new();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Returns the last record written or seeded.
    pub fn last(&self) -> Option<ProjectRecord> {
        self.lock().records.last().cloned()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProjectStore for MemoryStore {
    fn load_last(&self) -> Result<Option<ProjectRecord>, StoreError> {
        let state = self.lock();
        if state.failing {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(state.records.last().cloned())
    }

    fn save(&mut self, record: &ProjectRecord) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.failing {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        state.records.retain(|r| r.id != record.id);
        state.records.push(record.clone());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neck::ProjectData;

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("project.json"));
        assert!(store.load_last().unwrap().is_none());

        let record = ProjectRecord::new("p1", "Scales", ProjectData::demo());
        store.save(&record).unwrap();
        assert_eq!(store.load_last().unwrap(), Some(record));
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();
        let store = JsonFileStore::new(file.path());
        assert!(matches!(store.load_last(), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_memory_store_replaces_by_id() {
        let mut store = MemoryStore::new();
        let handle = store.clone();
        let mut record = ProjectRecord::new("p1", "First", ProjectData::blank());
        store.save(&record).unwrap();
        record.set_title("Second");
        store.save(&record).unwrap();

        assert_eq!(handle.save_count(), 2);
        assert_eq!(handle.last().map(|r| r.title), Some("Second".to_string()));
        assert_eq!(handle.lock().records.len(), 1);
    }

    #[test]
    fn test_failing_memory_store() {
        let mut store = MemoryStore::failing();
        assert!(store.load_last().is_err());
        let record = ProjectRecord::local_blank();
        assert!(matches!(store.save(&record), Err(StoreError::Unavailable(_))));

        store.set_failing(false);
        assert!(store.save(&record).is_ok());
        assert_eq!(store.save_count(), 1);
    }
}
