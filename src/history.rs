//! Bounded, newest-first history of generation results, persisted to a key-value slot.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::models::GenerationResult;

pub const HISTORY_KEY: &str = "creative-writer-history";
pub const MAX_ENTRIES: usize = 50;

/// Durable key-value storage. Writes are atomic from the caller's point of view.
pub trait StorageSlot: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One JSON file per key inside `dir`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> PathBuf { self.dir.join(format!("{}.json", key)) }
}

impl StorageSlot for FileStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &target)
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl StorageSlot for MemoryStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Immutable snapshot of the history, newest first, never longer than [`MAX_ENTRIES`].
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Arc<[GenerationResult]>,
}

impl Default for History {
    fn default() -> Self { Self { entries: Arc::from(Vec::new()) } }
}

impl History {
    fn from_vec(mut entries: Vec<GenerationResult>) -> Self {
        entries.truncate(MAX_ENTRIES);
        Self { entries: entries.into() }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, GenerationResult> { self.entries.iter() }

    pub fn as_slice(&self) -> &[GenerationResult] { &self.entries }

    /// Lookup over the snapshot for selecting a past result.
    pub fn find(&self, id: &str) -> Option<&GenerationResult> {
        self.entries.iter().find(|r| r.id == id)
    }

    fn prepend(&self, result: GenerationResult) -> Self {
        let mut entries = Vec::with_capacity(MAX_ENTRIES);
        entries.push(result);
        entries.extend(self.entries.iter().take(MAX_ENTRIES - 1).cloned());
        Self::from_vec(entries)
    }
}

/// Owns the persisted history. `append` and `clear` are serialized so the bound and
/// ordering hold even with concurrent callers; each persists before returning.
pub struct HistoryStore {
    storage: Arc<dyn StorageSlot>,
    current: Mutex<History>,
}

impl HistoryStore {
    /// Loads the persisted history once. Missing or corrupt data yields an empty history.
    pub fn open(storage: Arc<dyn StorageSlot>) -> Self {
        let current = Self::read_persisted(storage.as_ref());
        info!("📚 Loaded {} history entries", current.len());
        Self { storage, current: Mutex::new(current) }
    }

    /// Re-reads the persisted slot.
    pub fn load(&self) -> History {
        let history = Self::read_persisted(self.storage.as_ref());
        *self.current.lock() = history.clone();
        history
    }

    pub fn snapshot(&self) -> History { self.current.lock().clone() }

    pub fn append(&self, result: GenerationResult) -> History {
        let mut guard = self.current.lock();
        let next = guard.prepend(result);
        self.persist(&next);
        *guard = next.clone();
        next
    }

    pub fn clear(&self) -> History {
        let mut guard = self.current.lock();
        let next = History::default();
        self.persist(&next);
        *guard = next.clone();
        next
    }

    fn read_persisted(storage: &dyn StorageSlot) -> History {
        let raw = match storage.read(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return History::default(),
            Err(e) => {
                warn!("⚠️ Could not read history, starting empty: {}", e);
                return History::default();
            }
        };
        match serde_json::from_str::<Vec<GenerationResult>>(&raw) {
            Ok(entries) => History::from_vec(entries),
            Err(e) => {
                warn!("⚠️ Stored history is unreadable, starting empty: {}", e);
                History::default()
            }
        }
    }

    fn persist(&self, history: &History) {
        let payload = match serde_json::to_string(history.as_slice()) {
            Ok(p) => p,
            Err(e) => {
                warn!("⚠️ Could not serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.write(HISTORY_KEY, &payload) {
            warn!("⚠️ Could not persist history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationParams, Performance};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn result(n: usize) -> GenerationResult {
        GenerationResult {
            id: format!("res-{n}"),
            params: GenerationParams { prompt_text: format!("prompt {n}"), ..Default::default() },
            output: format!("output {n}"),
            timestamp: Utc::now(),
            performance: Performance { generation_time_ms: n as u64 },
        }
    }

    fn memory_store() -> (Arc<MemoryStorage>, HistoryStore) {
        let storage = Arc::new(MemoryStorage::default());
        let store = HistoryStore::open(storage.clone());
        (storage, store)
    }

    #[test]
    fn appending_past_the_cap_evicts_the_oldest() {
        let (_, store) = memory_store();
        let mut history = History::default();
        for n in 1..=51 {
            history = store.append(result(n));
        }
        assert_eq!(history.len(), MAX_ENTRIES);
        let ids: Vec<_> = history.iter().map(|r| r.id.clone()).collect();
        let expected: Vec<_> = (2..=51).rev().map(|n| format!("res-{n}")).collect();
        assert_eq!(ids, expected);
        assert!(history.find("res-1").is_none());
        assert_eq!(store.load(), history);
    }

    #[test]
    fn snapshots_are_not_affected_by_later_mutations() {
        let (_, store) = memory_store();
        let first = store.append(result(1));
        let _ = store.append(result(2));
        assert_eq!(first.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn clear_empties_and_persists() {
        let (storage, store) = memory_store();
        store.append(result(1));
        store.append(result(2));
        assert!(store.clear().is_empty());
        assert!(store.load().is_empty());
        assert!(HistoryStore::open(storage).snapshot().is_empty());
    }

    /// Reads nothing and refuses every write.
    struct ReadOnlyDisk;

    impl StorageSlot for ReadOnlyDisk {
        fn read(&self, _key: &str) -> io::Result<Option<String>> { Ok(None) }

        fn write(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"))
        }
    }

    #[test]
    fn failed_write_still_advances_the_snapshot() {
        let store = HistoryStore::open(Arc::new(ReadOnlyDisk));
        let history = store.append(result(1));
        assert_eq!(history.len(), 1);
        assert_eq!(store.snapshot().find("res-1").map(|r| r.output.as_str()), Some("output 1"));

        store.append(result(2));
        let ids: Vec<_> = store.snapshot().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["res-2", "res-1"]);
        assert!(store.clear().is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn corrupt_payload_degrades_to_empty() {
        let storage = Arc::new(MemoryStorage::default());
        storage.write(HISTORY_KEY, "{not json").unwrap();
        let store = HistoryStore::open(storage);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.append(result(1)).len(), 1);
    }

    #[test]
    fn oversized_payload_is_capped_on_load() {
        let storage = Arc::new(MemoryStorage::default());
        let entries: Vec<_> = (0..60).map(result).collect();
        storage.write(HISTORY_KEY, &serde_json::to_string(&entries).unwrap()).unwrap();
        let store = HistoryStore::open(storage);
        assert_eq!(store.snapshot().len(), MAX_ENTRIES);
        assert_eq!(store.snapshot().as_slice()[0].id, "res-0");
    }

    #[test]
    fn file_storage_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(Arc::new(FileStorage::new(dir.path())));
        store.append(result(7));

        let reopened = HistoryStore::open(Arc::new(FileStorage::new(dir.path())));
        assert_eq!(reopened.snapshot().find("res-7").map(|r| r.output.as_str()), Some("output 7"));
        assert!(dir.path().join("creative-writer-history.json").exists());
    }

    #[test]
    fn missing_directory_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("not-yet-created"));
        assert_eq!(storage.read(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn concurrent_appends_keep_the_bound() {
        let (_, store) = memory_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..20 {
                        store.append(result(t * 100 + n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.snapshot().len(), MAX_ENTRIES);
        assert_eq!(store.load().len(), MAX_ENTRIES);
    }
}
