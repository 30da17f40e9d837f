//! Storage adapters for workout history and the first-session marker.
//!
//! The session machine never touches storage; the coach awaits these calls
//! around it. Two implementations ship here:
//! - [`MemoryStorage`]: shared in-memory state, used by tests and as the
//!   reference behavior
//! - [`FileStorage`]: JSON files under a data directory with file locking and
//!   atomic replacement

use crate::schedule::{date_key, parse_date_key};
use crate::{Error, Result, SessionRecord, WorkoutHistory};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

const HISTORY_FILE: &str = "history.json";
const META_FILE: &str = "meta.json";
const LOCK_FILE: &str = ".lock";

/// Async persistence contract consumed by the coach
///
/// Calls may be slow or fail; callers must treat every error as recoverable.
pub trait StorageAdapter: Send + Sync {
    /// Full date -> record history
    fn load_history(&self) -> impl Future<Output = Result<WorkoutHistory>> + Send;

    /// Write the record for a date, replacing any existing one
    fn save_session(
        &self,
        date: NaiveDate,
        record: &SessionRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    fn first_session_date(&self) -> impl Future<Output = Result<Option<NaiveDate>>> + Send;

    /// First write wins: a no-op once a date is stored
    fn set_first_session_date(&self, date: NaiveDate) -> impl Future<Output = Result<()>> + Send;

    /// Whether the rest-day mobility routine was finished on `date`
    fn mobility_done(&self, date: NaiveDate) -> impl Future<Output = Result<bool>> + Send;

    fn set_mobility_done(&self, date: NaiveDate) -> impl Future<Output = Result<()>> + Send;

    /// Position in the micro-break rotation; 0 when never stored
    fn break_index(&self) -> impl Future<Output = Result<u32>> + Send;

    fn set_break_index(&self, index: u32) -> impl Future<Output = Result<()>> + Send;
}

// ============================================================================
// In-memory storage
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    history: WorkoutHistory,
    first_session_date: Option<NaiveDate>,
    mobility_done: BTreeSet<NaiveDate>,
    break_index: u32,
}

/// In-memory storage; clones share the same state
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with an existing history
    pub fn with_history(history: WorkoutHistory) -> Self {
        let storage = Self::default();
        if let Ok(mut state) = storage.state.lock() {
            state.first_session_date = history.iter().next().map(|(d, _)| d);
            state.history = history;
        }
        storage
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))?;
        Ok(f(&mut state))
    }
}

impl StorageAdapter for MemoryStorage {
    async fn load_history(&self) -> Result<WorkoutHistory> {
        self.with_state(|s| s.history.clone())
    }

    async fn save_session(&self, date: NaiveDate, record: &SessionRecord) -> Result<()> {
        self.with_state(|s| {
            s.history.insert(date, record.clone());
        })
    }

    async fn first_session_date(&self) -> Result<Option<NaiveDate>> {
        self.with_state(|s| s.first_session_date)
    }

    async fn set_first_session_date(&self, date: NaiveDate) -> Result<()> {
        self.with_state(|s| {
            s.first_session_date.get_or_insert(date);
        })
    }

    async fn mobility_done(&self, date: NaiveDate) -> Result<bool> {
        self.with_state(|s| s.mobility_done.contains(&date))
    }

    async fn set_mobility_done(&self, date: NaiveDate) -> Result<()> {
        self.with_state(|s| {
            s.mobility_done.insert(date);
        })
    }

    async fn break_index(&self) -> Result<u32> {
        self.with_state(|s| s.break_index)
    }

    async fn set_break_index(&self, index: u32) -> Result<()> {
        self.with_state(|s| s.break_index = index)
    }
}

// ============================================================================
// File storage
// ============================================================================

/// Small markers kept next to the history file
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_session_date: Option<String>,
    /// Date of the most recent finished mobility routine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mobility_done: Option<String>,
    /// Next micro-break in the rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    break_index: Option<u32>,
}

/// What the history file held on disk
enum StoredHistory {
    Parsed(WorkoutHistory),
    /// Present but unreadable, with the reason
    Corrupt(String),
}

/// JSON file storage rooted at a data directory
///
/// Layout: `history.json` (date key -> session record) and `meta.json`.
/// Reads take a shared lock; read-modify-write cycles hold an exclusive lock
/// on `.lock` so concurrent processes cannot drop each other's sessions.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    /// Run a blocking closure against a clone of this storage on tokio's
    /// blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(FileStorage) -> Result<T> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || f(storage))
            .await
            .map_err(|e| Error::Storage(format!("storage task failed: {}", e)))?
    }

    // ------------------------------------------------------------------------
    // Blocking primitives
    // ------------------------------------------------------------------------

    fn read_history_blocking(&self) -> Result<StoredHistory> {
        let path = self.history_path();
        let Some(bytes) = read_shared(&path)? else {
            tracing::debug!("No history file at {:?}", path);
            return Ok(StoredHistory::Parsed(WorkoutHistory::new()));
        };
        let contents = match String::from_utf8(bytes) {
            Ok(contents) => contents,
            Err(e) => return Ok(StoredHistory::Corrupt(format!("not valid UTF-8: {}", e))),
        };
        if contents.trim().is_empty() {
            return Ok(StoredHistory::Parsed(WorkoutHistory::new()));
        }

        Ok(match WorkoutHistory::from_json_lenient(&contents) {
            Ok(history) => StoredHistory::Parsed(history),
            Err(e) => StoredHistory::Corrupt(e.to_string()),
        })
    }

    fn load_history_blocking(&self) -> Result<WorkoutHistory> {
        match self.read_history_blocking()? {
            StoredHistory::Parsed(history) => Ok(history),
            StoredHistory::Corrupt(reason) => {
                tracing::warn!(
                    "Failed to parse history file {:?}: {}. Treating as empty.",
                    self.history_path(),
                    reason
                );
                Ok(WorkoutHistory::new())
            }
        }
    }

    /// Move an unreadable history file out of the way so a save cannot
    /// overwrite it
    fn quarantine_history(&self, reason: &str) -> Result<PathBuf> {
        let path = self.history_path();
        let backup = self.dir.join(format!(
            "{}.corrupt-{}",
            HISTORY_FILE,
            Utc::now().timestamp_millis()
        ));
        std::fs::rename(&path, &backup)?;
        tracing::warn!(
            "History file {:?} is unreadable ({}); moved it to {:?}",
            path,
            reason,
            backup
        );
        Ok(backup)
    }

    fn load_meta_blocking(&self) -> Result<Meta> {
        let path = self.meta_path();
        let Some(bytes) = read_shared(&path)? else {
            return Ok(Meta::default());
        };
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                tracing::warn!("Failed to parse meta file {:?}: {}. Using defaults.", path, e);
                Ok(Meta::default())
            }
        }
    }

    /// Hold the directory's exclusive lock for the duration of `f`
    fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        std::fs::create_dir_all(&self.dir)?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        lock.lock_exclusive()?;
        let result = f();
        let _ = lock.unlock();
        result
    }

    fn save_session_blocking(&self, date: NaiveDate, record: SessionRecord) -> Result<()> {
        self.exclusive(|| {
            let mut history = match self.read_history_blocking()? {
                StoredHistory::Parsed(history) => history,
                StoredHistory::Corrupt(reason) => {
                    self.quarantine_history(&reason)?;
                    WorkoutHistory::new()
                }
            };
            if history.insert(date, record).is_some() {
                tracing::info!("Replacing existing session for {}", date);
            }
            write_atomic(&self.history_path(), &serde_json::to_string(&history)?)?;
            tracing::debug!("Saved session for {} ({} total)", date, history.len());
            Ok(())
        })
    }

    fn update_meta_blocking(&self, f: impl FnOnce(&mut Meta) -> bool) -> Result<()> {
        self.exclusive(|| {
            let mut meta = self.load_meta_blocking()?;
            if f(&mut meta) {
                write_atomic(&self.meta_path(), &serde_json::to_string(&meta)?)?;
            }
            Ok(())
        })
    }
}

impl StorageAdapter for FileStorage {
    async fn load_history(&self) -> Result<WorkoutHistory> {
        self.blocking(|s| s.load_history_blocking()).await
    }

    async fn save_session(&self, date: NaiveDate, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.blocking(move |s| s.save_session_blocking(date, record))
            .await
    }

    async fn first_session_date(&self) -> Result<Option<NaiveDate>> {
        let meta = self.blocking(|s| s.load_meta_blocking()).await?;
        Ok(meta.first_session_date.and_then(|key| match parse_date_key(&key) {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!("Ignoring stored first session date: {}", e);
                None
            }
        }))
    }

    async fn set_first_session_date(&self, date: NaiveDate) -> Result<()> {
        self.blocking(move |s| {
            s.update_meta_blocking(|meta| {
                let valid = meta
                    .first_session_date
                    .as_deref()
                    .is_some_and(|key| parse_date_key(key).is_ok());
                if valid {
                    return false;
                }
                tracing::info!("First session date set to {}", date);
                meta.first_session_date = Some(date_key(date));
                true
            })
        })
        .await
    }

    async fn mobility_done(&self, date: NaiveDate) -> Result<bool> {
        let meta = self.blocking(|s| s.load_meta_blocking()).await?;
        Ok(meta.mobility_done.as_deref() == Some(date_key(date).as_str()))
    }

    async fn set_mobility_done(&self, date: NaiveDate) -> Result<()> {
        self.blocking(move |s| {
            s.update_meta_blocking(|meta| {
                meta.mobility_done = Some(date_key(date));
                true
            })
        })
        .await
    }

    async fn break_index(&self) -> Result<u32> {
        let meta = self.blocking(|s| s.load_meta_blocking()).await?;
        Ok(meta.break_index.unwrap_or(0))
    }

    async fn set_break_index(&self, index: u32) -> Result<()> {
        self.blocking(move |s| {
            s.update_meta_blocking(|meta| {
                meta.break_index = Some(index);
                true
            })
        })
        .await
    }
}

/// Read a file's bytes under a shared lock; `None` when it does not exist
fn read_shared(path: &Path) -> Result<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let mut contents = Vec::new();
    let read = std::io::BufReader::new(&file).read_to_end(&mut contents);
    let _ = file.unlock();
    read?;
    Ok(Some(contents))
}

/// Replace `path` atomically: temp file in the same directory, fsync, rename
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("{:?} has no parent directory", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
