use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use ipo_core::{HistoryStats, IpoId, IpoRecord, NotificationHistory};
use ipo_logging::{ipo_debug, ipo_error, ipo_info};

use crate::persist::{ensure_dir, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read history at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("history at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("cannot write history: {0}")]
    Write(#[from] PersistError),
    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

/// Whole-history read/write against some durable resource.
pub trait HistoryBackend: Send {
    fn read(&self) -> Result<NotificationHistory, StoreError>;
    fn write(&self, history: &NotificationHistory) -> Result<(), StoreError>;
    /// Confirms a later `write` could succeed, without changing the history.
    fn check_writable(&self) -> Result<(), StoreError>;
    /// Human-readable location, for logs and stats.
    fn location(&self) -> String;
    fn size_bytes(&self) -> Option<u64> {
        None
    }
}

/// History kept as a keyed JSON object in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    writer: AtomicFileWriter,
}

impl JsonFileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.target()
    }
}

impl HistoryBackend for JsonFileBackend {
    fn read(&self) -> Result<NotificationHistory, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                ipo_info!("No history at {:?}; starting empty", path);
                return Ok(NotificationHistory::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(NotificationHistory::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    fn write(&self, history: &NotificationHistory) -> Result<(), StoreError> {
        let mut content = serde_json::to_string_pretty(history).map_err(StoreError::Serialize)?;
        content.push('\n');
        self.writer.write(&content)?;
        Ok(())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        ensure_dir(&self.writer.dir())?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }

    fn size_bytes(&self) -> Option<u64> {
        fs::metadata(self.path()).ok().map(|meta| meta.len())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    history: NotificationHistory,
    writes: usize,
    fail_writes: bool,
}

/// In-process backend; clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: NotificationHistory) -> Self {
        let backend = Self::new();
        backend.lock().history = history;
        backend
    }

    pub fn snapshot(&self) -> NotificationHistory {
        self.lock().history.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Makes subsequent writes fail, to exercise store-error handling.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HistoryBackend for MemoryBackend {
    fn read(&self) -> Result<NotificationHistory, StoreError> {
        Ok(self.lock().history.clone())
    }

    fn write(&self, history: &NotificationHistory) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        state.history = history.clone();
        state.writes += 1;
        Ok(())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.lock().fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub history: HistoryStats,
    pub location: String,
    pub size_bytes: Option<u64>,
}

/// Loaded notification history bound to its backend.
///
/// Changes are written with [`persist`](Self::persist); a store dropped with
/// unsaved changes writes them back itself so a confirmed send is never lost.
pub struct HistoryStore<B: HistoryBackend> {
    backend: B,
    history: NotificationHistory,
    dirty: bool,
}

impl<B: HistoryBackend> HistoryStore<B> {
    pub fn load(backend: B) -> Result<Self, StoreError> {
        let history = backend.read()?;
        ipo_debug!(
            "Loaded {} history entries from {}",
            history.len(),
            backend.location()
        );
        Ok(Self {
            backend,
            history,
            dirty: false,
        })
    }

    pub fn is_notified(&self, id: &IpoId) -> bool {
        self.history.is_notified(id)
    }

    pub fn mark_notified(&mut self, id: IpoId, at: DateTime<Utc>) {
        self.history.mark_notified(id, at);
        self.dirty = true;
    }

    /// Records a confirmed send together with the listing's details.
    pub fn record_notification(&mut self, record: &IpoRecord, at: DateTime<Utc>) {
        self.history.record_notification(record, at);
        self.dirty = true;
    }

    pub fn cleanup(&mut self, older_than_days: u32, now: DateTime<Utc>) -> usize {
        let removed = self.history.cleanup(older_than_days, now);
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Writes pending changes; a no-op when nothing changed.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.backend.write(&self.history)?;
        self.dirty = false;
        ipo_debug!(
            "Persisted {} history entries to {}",
            self.history.len(),
            self.backend.location()
        );
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn history(&self) -> &NotificationHistory {
        &self.history
    }

    pub fn notified_ids(&self) -> BTreeSet<IpoId> {
        self.history.ids().cloned().collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            history: self.history.stats(),
            location: self.backend.location(),
            size_bytes: self.backend.size_bytes(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: HistoryBackend> Drop for HistoryStore<B> {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        match self.backend.write(&self.history) {
            Ok(()) => ipo_info!(
                "Wrote back unsaved history to {}",
                self.backend.location()
            ),
            Err(err) => ipo_error!(
                "Failed to write back history to {}: {}",
                self.backend.location(),
                err
            ),
        }
    }
}
