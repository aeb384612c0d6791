//! Durable file-backed state store.
//!
//! [`FileStore`] keeps an append-only log of every put and replays it
//! into in-memory tables when opened. Reads are served from memory; writes
//! go to the log first and are applied to memory only once the log append
//! has succeeded. A single writer holds the log mutex for the whole write,
//! so the log order and the in-memory order always agree.

mod log;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use keel_types::{validate_workspace_name, EntityKind, Record, WorkspaceMeta};
use tracing::{debug, info};

use crate::config::SyncMode;
use crate::error::{Fault, Op, StoreError, StoreResult};
use crate::filter::ListFilter;
use crate::scope::{ScopeEntry, ScopeScan};
use crate::tables::{read_lock, write_lock, Tables};
use crate::traits::{EntityStore, StateStore, WorkspaceMetaStore};

use self::log::{LogEntry, RecordLog};

/// Options for opening a [`FileStore`].
#[derive(Clone, Debug)]
pub struct FileStoreOptions {
    pub sync_mode: SyncMode,
    /// Rewrite the log to one entry per live record right after opening.
    pub compact_on_open: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::EveryWrite,
            compact_on_open: false,
        }
    }
}

/// In-memory view rebuilt from the log.
#[derive(Debug, Default)]
struct FileState {
    tables: Tables,
    /// Scope of every record, kept apart from payloads for scope scans.
    scopes: BTreeMap<EntityKind, BTreeMap<String, ScopeEntry>>,
}

impl FileState {
    fn apply(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Record(record) => {
                let scope = ScopeEntry::from_record(&record);
                self.scopes
                    .entry(scope.kind)
                    .or_default()
                    .insert(scope.id.clone(), scope);
                self.tables.insert(record);
            }
            LogEntry::Workspace(meta) => self.tables.put_workspace(meta),
        }
    }

    fn live_entries(&self) -> Vec<LogEntry> {
        self.tables
            .records()
            .cloned()
            .map(LogEntry::Record)
            .chain(self.tables.workspaces().cloned().map(LogEntry::Workspace))
            .collect()
    }
}

/// Durable state store backed by a single append-only log file.
pub struct FileStore {
    path: PathBuf,
    log: Mutex<RecordLog>,
    state: RwLock<FileState>,
}

impl FileStore {
    /// Open the store at `path` with default options, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, FileStoreOptions::default())
    }

    /// Open the store at `path`, replaying its log.
    ///
    /// Fails with a storage fault if the log is corrupt.
    pub fn open_with(path: impl AsRef<Path>, options: FileStoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let (log, entries) = RecordLog::open(path, options.sync_mode)
            .map_err(|e| StoreError::fault(Op::Open, "record log", None, e))?;

        let replayed = entries.len();
        let mut state = FileState::default();
        for entry in entries {
            state.apply(entry);
        }

        info!(
            path = %path.display(),
            replayed,
            records = state.tables.record_count(),
            workspaces = state.tables.workspace_count(),
            "file store opened"
        );

        let store = Self {
            path: path.to_path_buf(),
            log: Mutex::new(log),
            state: RwLock::new(state),
        };
        if options.compact_on_open {
            store.compact()?;
        }
        Ok(store)
    }

    /// Rewrite the log so it holds exactly one entry per live record and
    /// workspace.
    pub fn compact(&self) -> StoreResult<()> {
        let mut log = self.lock_log(Op::Compact, "record log")?;
        let state = read_lock(&self.state, Op::Compact, "record log")?;
        let before = log.offset();
        log.rewrite(&state.live_entries())
            .map_err(|e| StoreError::fault(Op::Compact, "record log", None, e))?;
        info!(path = %self.path.display(), before, after = log.offset(), "file store compacted");
        Ok(())
    }

    /// Current size of the log in bytes.
    pub fn log_len(&self) -> StoreResult<u64> {
        Ok(self.lock_log(Op::List, "record log")?.offset())
    }

    fn lock_log(&self, op: Op, kind: &'static str) -> StoreResult<MutexGuard<'_, RecordLog>> {
        self.log
            .lock()
            .map_err(|_| StoreError::fault(op, kind, None, Fault::Poisoned))
    }

    /// Fails if the in-memory state can no longer take a write.
    ///
    /// Only writers holding the log mutex take the state write lock, so a
    /// check made under that mutex still holds when the append returns.
    fn check_state(&self, op: Op, kind: &'static str, id: &str) -> StoreResult<()> {
        if self.state.is_poisoned() {
            return Err(StoreError::fault(op, kind, Some(id), Fault::Poisoned));
        }
        Ok(())
    }
}

impl EntityStore for FileStore {
    fn put(&self, record: &Record) -> StoreResult<()> {
        record.validate()?;
        let kind = record.kind();
        let id = record.id();

        let mut log = self.lock_log(Op::Put, kind.as_str())?;
        self.check_state(Op::Put, kind.as_str(), id)?;
        let entry = LogEntry::Record(record.clone());
        let offset = log
            .append(&entry)
            .map_err(|e| StoreError::fault(Op::Put, kind.as_str(), Some(id), e))?;

        write_lock(&self.state, Op::Put, kind.as_str())?.apply(entry);
        debug!(%kind, id, offset, "file put");
        Ok(())
    }

    fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Record> {
        let state = read_lock(&self.state, Op::Get, kind.as_str())?;
        state
            .tables
            .get(kind, id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind.as_str(), id))
    }

    fn list(&self, kind: EntityKind, filter: &ListFilter) -> StoreResult<Vec<Record>> {
        let state = read_lock(&self.state, Op::List, kind.as_str())?;
        Ok(state.tables.list(kind, filter))
    }

    fn scan_scopes(&self, kind: EntityKind) -> StoreResult<ScopeScan> {
        let state = read_lock(&self.state, Op::Scan, kind.as_str())?;
        Ok(state
            .scopes
            .get(&kind)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_else(|| ScopeScan::new(Vec::new())))
    }
}

impl WorkspaceMetaStore for FileStore {
    fn update_workspace_meta(
        &self,
        name: &str,
        update: &dyn Fn(Option<&WorkspaceMeta>) -> WorkspaceMeta,
    ) -> StoreResult<WorkspaceMeta> {
        validate_workspace_name(name)?;
        let mut log = self.lock_log(Op::PutWorkspace, "workspace")?;
        self.check_state(Op::PutWorkspace, "workspace", name)?;
        let meta = {
            let state = read_lock(&self.state, Op::PutWorkspace, "workspace")?;
            update(state.tables.workspace(name))
        };
        if meta.name != name {
            return Err(StoreError::invalid(format!(
                "workspace metadata for {name:?} is named {:?}",
                meta.name
            )));
        }

        let entry = LogEntry::Workspace(meta.clone());
        log.append(&entry)
            .map_err(|e| StoreError::fault(Op::PutWorkspace, "workspace", Some(name), e))?;
        write_lock(&self.state, Op::PutWorkspace, "workspace")?.apply(entry);
        debug!(workspace = name, "file workspace put");
        Ok(meta)
    }

    fn get_workspace_meta(&self, name: &str) -> StoreResult<Option<WorkspaceMeta>> {
        let state = read_lock(&self.state, Op::GetWorkspace, "workspace")?;
        Ok(state.tables.workspace(name).cloned())
    }

    fn list_workspace_meta(&self) -> StoreResult<Vec<WorkspaceMeta>> {
        let state = read_lock(&self.state, Op::ListWorkspaces, "workspace")?;
        Ok(state.tables.workspaces().cloned().collect())
    }
}

impl StateStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn close(&self) -> StoreResult<()> {
        self.lock_log(Op::Close, "record log")?
            .sync()
            .map_err(|e| StoreError::fault(Op::Close, "record log", None, e))?;
        debug!(path = %self.path.display(), "file store closed");
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}
