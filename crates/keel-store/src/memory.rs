use std::sync::RwLock;

use keel_types::{validate_workspace_name, EntityKind, Record, WorkspaceMeta};
use tracing::debug;

use crate::error::{Op, StoreError, StoreResult};
use crate::filter::ListFilter;
use crate::tables::{read_lock, write_lock, Tables};
use crate::traits::{EntityStore, StateStore, WorkspaceMetaStore};

/// In-memory, `BTreeMap`-based state store.
///
/// Intended for tests and embedding. All state is held behind a single
/// `RwLock`; records are cloned on read and write. Nothing survives the
/// store being dropped, so it is not durable. There is no separate scope
/// index: scope scans project the scope out of full records.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of records currently stored, across all kinds.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(read_lock(&self.tables, Op::List, "record")?.record_count())
    }

    /// Returns `true` if no records and no workspace metadata are stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        let tables = read_lock(&self.tables, Op::List, "record")?;
        Ok(tables.record_count() == 0 && tables.workspace_count() == 0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryStore {
    fn put(&self, record: &Record) -> StoreResult<()> {
        record.validate()?;
        let kind = record.kind();
        let mut tables = write_lock(&self.tables, Op::Put, kind.as_str())?;
        let replaced = tables.insert(record.clone()).is_some();
        debug!(%kind, id = record.id(), replaced, "memory put");
        Ok(())
    }

    fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Record> {
        let tables = read_lock(&self.tables, Op::Get, kind.as_str())?;
        tables
            .get(kind, id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind.as_str(), id))
    }

    fn list(&self, kind: EntityKind, filter: &ListFilter) -> StoreResult<Vec<Record>> {
        let tables = read_lock(&self.tables, Op::List, kind.as_str())?;
        Ok(tables.list(kind, filter))
    }
}

impl WorkspaceMetaStore for InMemoryStore {
    fn update_workspace_meta(
        &self,
        name: &str,
        update: &dyn Fn(Option<&WorkspaceMeta>) -> WorkspaceMeta,
    ) -> StoreResult<WorkspaceMeta> {
        validate_workspace_name(name)?;
        let mut tables = write_lock(&self.tables, Op::PutWorkspace, "workspace")?;
        let meta = update(tables.workspace(name));
        if meta.name != name {
            return Err(StoreError::invalid(format!(
                "workspace metadata for {name:?} is named {:?}",
                meta.name
            )));
        }
        tables.put_workspace(meta.clone());
        debug!(workspace = name, "memory workspace put");
        Ok(meta)
    }

    fn get_workspace_meta(&self, name: &str) -> StoreResult<Option<WorkspaceMeta>> {
        let tables = read_lock(&self.tables, Op::GetWorkspace, "workspace")?;
        Ok(tables.workspace(name).cloned())
    }

    fn list_workspace_meta(&self) -> StoreResult<Vec<WorkspaceMeta>> {
        let tables = read_lock(&self.tables, Op::ListWorkspaces, "workspace")?;
        Ok(tables.workspaces().cloned().collect())
    }
}

impl StateStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().ok();
        f.debug_struct("InMemoryStore")
            .field("record_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EntityStoreExt;
    use keel_types::{ApplicationRef, Build, Deployment, Trigger, WorkspaceRef};

    fn make_build(id: &str) -> Build {
        Build {
            id: id.into(),
            application: Some(ApplicationRef::new("web", "api")),
            ..Build::default()
        }
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get_build() {
        let store = InMemoryStore::new();
        store.put_entity(make_build("1")).unwrap();

        let read_back: Build = store.get_entity("1").unwrap();
        assert_eq!(read_back, make_build("1"));
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get(EntityKind::Build, "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn same_id_different_kind_is_missing() {
        let store = InMemoryStore::new();
        store.put_entity(make_build("1")).unwrap();
        assert!(store.get_entity::<Deployment>("1").unwrap_err().is_not_found());
    }

    #[test]
    fn put_replaces_whole_record() {
        let store = InMemoryStore::new();
        let mut build = make_build("1");
        build.labels.insert("a".into(), "1".into());
        store.put_entity(build).unwrap();

        store.put_entity(make_build("1")).unwrap();
        let read_back: Build = store.get_entity("1").unwrap();
        assert!(read_back.labels.is_empty());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn invalid_put_leaves_state_untouched() {
        let store = InMemoryStore::new();
        store.put_entity(make_build("1")).unwrap();

        let mut bad = make_build("1");
        bad.workspace = Some(WorkspaceRef::new("has space"));
        assert!(store.put_entity(bad).unwrap_err().is_invalid());

        let read_back: Build = store.get_entity("1").unwrap();
        assert_eq!(read_back, make_build("1"));
    }

    // -----------------------------------------------------------------------
    // Listing and scans
    // -----------------------------------------------------------------------

    #[test]
    fn list_filters_by_workspace() {
        let store = InMemoryStore::new();
        store.put_entity(make_build("1")).unwrap();
        let mut other = make_build("2");
        other.workspace = Some(WorkspaceRef::new("prod"));
        store.put_entity(other).unwrap();

        let prod: Vec<Build> = store
            .list_entities(&ListFilter::all().workspace("prod"))
            .unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].id, "2");
    }

    #[test]
    fn scan_scopes_yields_one_entry_per_record() {
        let store = InMemoryStore::new();
        store.put_entity(make_build("1")).unwrap();
        store.put_entity(make_build("2")).unwrap();
        store
            .put_entity(Trigger {
                id: "t".into(),
                name: "t".into(),
                ..Trigger::default()
            })
            .unwrap();

        let scan = store.scan_scopes(EntityKind::Build).unwrap();
        assert_eq!(scan.len(), 2);
        assert!(scan.clone().all(|e| e.scope.matches_project("web")));
    }

    // -----------------------------------------------------------------------
    // Workspace metadata
    // -----------------------------------------------------------------------

    #[test]
    fn workspace_meta_roundtrip() {
        let store = InMemoryStore::new();
        assert!(store.get_workspace_meta("dev").unwrap().is_none());

        let meta = WorkspaceMeta {
            name: "dev".into(),
            ..WorkspaceMeta::default()
        };
        store.put_workspace_meta(&meta).unwrap();
        assert_eq!(store.get_workspace_meta("dev").unwrap(), Some(meta));
        assert_eq!(store.list_workspace_meta().unwrap().len(), 1);
    }

    #[test]
    fn update_rejects_renamed_meta() {
        let store = InMemoryStore::new();
        let err = store
            .update_workspace_meta("dev", &|_| WorkspaceMeta {
                name: "prod".into(),
                ..WorkspaceMeta::default()
            })
            .unwrap_err();
        assert!(err.is_invalid());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn meta_writes_validate_the_name() {
        let store = InMemoryStore::new();
        for name in ["", "has space", "-lead", "dot.ted"] {
            let err = store
                .put_workspace_meta(&WorkspaceMeta {
                    name: name.into(),
                    ..WorkspaceMeta::default()
                })
                .unwrap_err();
            assert!(err.is_invalid(), "{name:?} should be rejected");
        }
        assert!(store.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_puts_on_distinct_ids() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..25 {
                        store.put_entity(make_build(&format!("{i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len().unwrap(), 200);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryStore"));
        assert!(debug.contains("record_count"));
    }
}
