//! File-backed record store
//!
//! [`FileStore`] wraps a [`RecordStore`] and rewrites the snapshot file after
//! every mutation that changed something. Writes go to a temp file in the
//! same directory which is then renamed over the snapshot, so readers never
//! see a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;
use crate::history::{RecencyTracker, ViewHistory};
use crate::record::{Epic, Record, RecordId, RecordKind, SubTask, Task};
use crate::snapshot;
use crate::store::RecordStore;

#[derive(Debug)]
pub struct FileStore<H = RecencyTracker> {
    path: PathBuf,
    store: RecordStore<H>,
}

impl<H: ViewHistory> FileStore<H> {
    /// Load the snapshot at `path`, or start empty if the file does not exist.
    ///
    /// An existing file that is empty or malformed is an error and nothing
    /// is loaded.
    pub fn open(path: impl Into<PathBuf>, history: H) -> Result<Self> {
        let path = path.into();
        let store = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let store = snapshot::decode_with(&content, history)?;
            info!(path = %path.display(), records = store.len(), "loaded snapshot");
            store
        } else {
            RecordStore::with_history(history)
        };
        Ok(Self { path, store })
    }

    /// Start an empty store that will be saved to `path`
    pub fn create(path: impl Into<PathBuf>, history: H) -> Self {
        Self {
            path: path.into(),
            store: RecordStore::with_history(history),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only view of the records
    pub fn store(&self) -> &RecordStore<H> {
        &self.store
    }

    /// Write the current snapshot
    pub fn save(&self) -> Result<()> {
        let text = snapshot::encode(&self.store);
        write_atomic(&self.path, text.as_bytes())?;
        info!(path = %self.path.display(), records = self.store.len(), "saved snapshot");
        Ok(())
    }

    pub fn create_record(&mut self, record: impl Into<Record>) -> Result<Option<RecordId>> {
        let id = self.store.create(record)?;
        if id.is_some() {
            self.save()?;
        }
        Ok(id)
    }

    pub fn create_task(&mut self, task: Task) -> Result<RecordId> {
        let id = self.store.create_task(task)?;
        self.save()?;
        Ok(id)
    }

    pub fn create_epic(&mut self, epic: Epic) -> Result<RecordId> {
        let id = self.store.create_epic(epic)?;
        self.save()?;
        Ok(id)
    }

    pub fn create_subtask(&mut self, subtask: SubTask) -> Result<Option<RecordId>> {
        self.create_record(subtask)
    }

    pub fn update(&mut self, record: impl Into<Record>) -> Result<bool> {
        let updated = self.store.update(record)?;
        if updated {
            self.save()?;
        }
        Ok(updated)
    }

    /// Fetch a record and mark it as viewed
    pub fn get(&mut self, kind: RecordKind, id: RecordId) -> Option<Record> {
        self.store.get(kind, id)
    }

    /// Fetch a record of any kind and mark it as viewed
    pub fn find(&mut self, id: RecordId) -> Option<Record> {
        self.store.find(id)
    }

    pub fn remove(&mut self, kind: RecordKind, id: RecordId) -> Result<()> {
        self.store.remove(kind, id);
        self.save()
    }

    pub fn remove_id(&mut self, id: RecordId) -> Result<Option<RecordKind>> {
        let kind = self.store.remove_id(id);
        if kind.is_some() {
            self.save()?;
        }
        Ok(kind)
    }

    pub fn clear_kind(&mut self, kind: RecordKind) -> Result<()> {
        self.store.clear_kind(kind);
        self.save()
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.store.clear_all();
        self.save()
    }
}

/// Write data atomically using temp file + rename
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut file = NamedTempFile::new_in(&parent)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}
