//! In-memory tables shared by the backends.
//!
//! The in-memory backend keeps these as its only state; the file backend
//! rebuilds them from its log on open.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use keel_types::{EntityKind, Record, WorkspaceMeta};

use crate::error::{Fault, Op, StoreError, StoreResult};
use crate::filter::ListFilter;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    records: BTreeMap<EntityKind, BTreeMap<String, Record>>,
    workspaces: BTreeMap<String, WorkspaceMeta>,
}

impl Tables {
    /// Insert or replace a record, returning the previous version.
    pub(crate) fn insert(&mut self, record: Record) -> Option<Record> {
        self.records
            .entry(record.kind())
            .or_default()
            .insert(record.id().to_string(), record)
    }

    pub(crate) fn get(&self, kind: EntityKind, id: &str) -> Option<&Record> {
        self.records.get(&kind)?.get(id)
    }

    pub(crate) fn list(&self, kind: EntityKind, filter: &ListFilter) -> Vec<Record> {
        self.records
            .get(&kind)
            .map(|by_id| {
                by_id
                    .values()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values().flat_map(|by_id| by_id.values())
    }

    pub(crate) fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn put_workspace(&mut self, meta: WorkspaceMeta) {
        self.workspaces.insert(meta.name.clone(), meta);
    }

    pub(crate) fn workspace(&self, name: &str) -> Option<&WorkspaceMeta> {
        self.workspaces.get(name)
    }

    pub(crate) fn workspaces(&self) -> impl Iterator<Item = &WorkspaceMeta> {
        self.workspaces.values()
    }

    pub(crate) fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    op: Op,
    kind: &'static str,
) -> StoreResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| StoreError::fault(op, kind, None, Fault::Poisoned))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    op: Op,
    kind: &'static str,
) -> StoreResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| StoreError::fault(op, kind, None, Fault::Poisoned))
}
