use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::file::{FileStore, FileStoreOptions};
use crate::memory::InMemoryStore;
use crate::traits::StateStore;

/// Which backend to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

/// Flush strategy for durable backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Sync after every write. A put is durable once it returns.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Configuration for opening a state store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Path of the log file. Required for the file backend.
    pub path: Option<PathBuf>,
    pub sync_mode: SyncMode,
    pub compact_on_open: bool,
}

impl StoreConfig {
    /// A file-backed configuration at `path` with default settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        toml::from_str(source).map_err(|e| StoreError::invalid(format!("store config: {e}")))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            StoreError::invalid(format!("store config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }
}

/// Open the backend described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match config.backend {
        BackendKind::Memory => Box::new(InMemoryStore::new()),
        BackendKind::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| StoreError::invalid("file backend requires a path"))?;
            let options = FileStoreOptions {
                sync_mode: config.sync_mode,
                compact_on_open: config.compact_on_open,
            };
            Box::new(FileStore::open_with(path, options)?)
        }
    };
    info!(backend = store.backend_name(), durable = store.is_durable(), "state store ready");
    Ok(store)
}
