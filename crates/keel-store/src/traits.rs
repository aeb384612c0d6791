use std::path::Path;

use keel_types::{Entity, EntityKind, Record, WorkspaceMeta};

use crate::error::{StoreError, StoreResult};
use crate::filter::ListFilter;
use crate::scope::{ScopeEntry, ScopeScan};

/// Keyed storage of operational records and triggers.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert by `(kind, id)` that replaces the whole record.
/// - `put` validates identity and scope and fails with `Invalid` before
///   touching any state.
/// - A failed `put` leaves the previous version of the record in place.
/// - Readers never observe a partially written record.
/// - `list` returns records ordered by id.
pub trait EntityStore: Send + Sync {
    /// Insert or replace a record.
    fn put(&self, record: &Record) -> StoreResult<()>;

    /// Read a record by kind and id.
    ///
    /// Returns `NotFound` if no record of that kind has the id.
    fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Record>;

    /// List records of a kind that match `filter`, ordered by id.
    ///
    /// An empty store yields an empty list, not an error.
    fn list(&self, kind: EntityKind, filter: &ListFilter) -> StoreResult<Vec<Record>>;

    /// Scan the scope of every stored record of a kind.
    ///
    /// The default lists full records and projects their scope fields.
    /// Backends that keep a separate scope index should override this.
    fn scan_scopes(&self, kind: EntityKind) -> StoreResult<ScopeScan> {
        let records = self.list(kind, &ListFilter::all())?;
        Ok(records.iter().map(ScopeEntry::from_record).collect())
    }
}

/// Storage for explicit workspace metadata.
pub trait WorkspaceMetaStore: Send + Sync {
    /// Read-modify-write the metadata stored under `name`.
    ///
    /// `update` receives the current metadata (if any) and returns the
    /// metadata to store. No other writer can interleave with the update.
    /// Fails with `Invalid` if `name` breaks the workspace-name rules.
    fn update_workspace_meta(
        &self,
        name: &str,
        update: &dyn Fn(Option<&WorkspaceMeta>) -> WorkspaceMeta,
    ) -> StoreResult<WorkspaceMeta>;

    /// Read the metadata stored under `name`, if any.
    fn get_workspace_meta(&self, name: &str) -> StoreResult<Option<WorkspaceMeta>>;

    /// All stored workspace metadata, ordered by name.
    fn list_workspace_meta(&self) -> StoreResult<Vec<WorkspaceMeta>>;

    /// Store `meta`, replacing whatever was stored under its name.
    fn put_workspace_meta(&self, meta: &WorkspaceMeta) -> StoreResult<()> {
        self.update_workspace_meta(&meta.name, &|_| meta.clone())?;
        Ok(())
    }
}

/// A complete state store backend.
pub trait StateStore: EntityStore + WorkspaceMetaStore {
    /// Short backend name for logs and reports.
    fn backend_name(&self) -> &'static str;

    /// Whether writes survive closing and reopening the store.
    fn is_durable(&self) -> bool;

    /// The durable medium backing this store, if it has one.
    fn location(&self) -> Option<&Path> {
        None
    }

    /// Flush everything to the durable medium.
    ///
    /// The handle remains usable; dropping it after `close` is the way to
    /// release the medium.
    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Typed helpers over [`EntityStore`].
pub trait EntityStoreExt: EntityStore {
    fn put_entity<E: Entity>(&self, entity: E) -> StoreResult<()> {
        self.put(&entity.into_record())
    }

    fn get_entity<E: Entity>(&self, id: &str) -> StoreResult<E> {
        let record = self.get(E::KIND, id)?;
        E::from_record(record).ok_or_else(|| StoreError::not_found(E::KIND.as_str(), id))
    }

    fn list_entities<E: Entity>(&self, filter: &ListFilter) -> StoreResult<Vec<E>> {
        Ok(self
            .list(E::KIND, filter)?
            .into_iter()
            .filter_map(E::from_record)
            .collect())
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}
