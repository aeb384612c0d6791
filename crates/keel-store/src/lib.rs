//! Entity storage for the Keel state layer.
//!
//! This crate defines the storage contract every backend implements and
//! ships two backends. Records are keyed by `(kind, id)` and upserted whole;
//! nothing is ever structurally deleted.
//!
//! # Storage Backends
//!
//! All backends implement the [`StateStore`] trait:
//!
//! - [`InMemoryStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileStore`] -- append-only, checksummed record log replayed on open
//!
//! # Design Rules
//!
//! 1. A `put` is atomic per record: readers see the old or the new version.
//! 2. A failed `put` leaves prior state untouched.
//! 3. Durable backends do not return from `put` before the write is on disk
//!    (with [`SyncMode::EveryWrite`]).
//! 4. Listings are ordered by id, so results are reproducible.
//! 5. Storage faults are propagated with the failing operation attached,
//!    never swallowed or retried.

pub mod config;
pub mod error;
pub mod file;
pub mod filter;
pub mod memory;
pub mod scope;
mod tables;
pub mod traits;

pub use config::{open_store, BackendKind, StoreConfig, SyncMode};
pub use error::{Fault, Op, StoreError, StoreResult};
pub use file::{FileStore, FileStoreOptions};
pub use filter::{ListFilter, ListTriggerRequest};
pub use memory::InMemoryStore;
pub use scope::{ScopeEntry, ScopeScan};
pub use traits::{EntityStore, EntityStoreExt, StateStore, WorkspaceMetaStore};
