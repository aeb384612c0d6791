//! Bindings of the shipped backends to the conformance capabilities.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keel_store::{
    Fault, FileStore, FileStoreOptions, InMemoryStore, Op, StateStore, StoreError, StoreResult,
};
use tempfile::TempDir;
use tracing::debug;

use crate::factory::{Factory, RestartFactory};

/// Builds empty [`InMemoryStore`]s. Pair it with
/// [`NoRestart`](crate::NoRestart).
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryBackend;

impl Factory for MemoryBackend {
    fn create(&self) -> StoreResult<Box<dyn StateStore>> {
        Ok(Box::new(InMemoryStore::new()))
    }
}

/// Builds [`FileStore`]s, each in its own temporary directory, and reopens
/// them on restart.
///
/// Temporary directories live as long as the backend, so a store can be
/// restarted any number of times within a case.
#[derive(Debug)]
pub struct FileBackend {
    options: FileStoreOptions,
    dirs: Mutex<Vec<TempDir>>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::with_options(FileStoreOptions::default())
    }

    pub fn with_options(options: FileStoreOptions) -> Self {
        Self {
            options,
            dirs: Mutex::new(Vec::new()),
        }
    }

    /// Number of stores created so far.
    pub fn created(&self) -> StoreResult<usize> {
        Ok(self.lock_dirs()?.len())
    }

    fn lock_dirs(&self) -> StoreResult<MutexGuard<'_, Vec<TempDir>>> {
        self.dirs
            .lock()
            .map_err(|_| StoreError::fault(Op::Open, "store", None, Fault::Poisoned))
    }

    fn open(&self, path: &Path) -> StoreResult<Box<dyn StateStore>> {
        Ok(Box::new(FileStore::open_with(path, self.options.clone())?))
    }
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory for FileBackend {
    fn create(&self) -> StoreResult<Box<dyn StateStore>> {
        let dir = tempfile::Builder::new()
            .prefix("keel-conformance-")
            .tempdir()
            .map_err(|e| StoreError::fault(Op::Open, "store", None, e))?;
        let path = dir.path().join("state.db");
        let store = self.open(&path)?;
        self.lock_dirs()?.push(dir);
        debug!(path = %path.display(), "conformance store created");
        Ok(store)
    }
}

impl RestartFactory for FileBackend {
    fn restart(&self, store: Box<dyn StateStore>) -> StoreResult<Box<dyn StateStore>> {
        let path: PathBuf = store
            .location()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::invalid("store has no durable location to reopen"))?;
        store.close()?;
        drop(store);
        debug!(path = %path.display(), "conformance store restarted");
        self.open(&path)
    }

    fn is_durable(&self) -> bool {
        true
    }
}
