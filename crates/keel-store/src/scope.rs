//! Scope scanning.
//!
//! A scope scan yields one [`ScopeEntry`] per stored record of a kind,
//! without the record payloads. The workspace index is built from these.

use std::sync::Arc;

use keel_types::{EntityKind, Record, Scope};

/// The resolved scope of a single stored record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeEntry {
    pub kind: EntityKind,
    pub id: String,
    pub scope: Scope,
}

impl ScopeEntry {
    pub fn from_record(record: &Record) -> Self {
        Self {
            kind: record.kind(),
            id: record.id().to_string(),
            scope: record.scope(),
        }
    }
}

/// A finite, restartable sequence of scope entries.
///
/// The scan is a snapshot taken when it was produced: later writes are not
/// visible through it. Clones share the snapshot; [`ScopeScan::restart`]
/// starts over from the first entry without touching the store again.
#[derive(Clone, Debug)]
pub struct ScopeScan {
    entries: Arc<[ScopeEntry]>,
    pos: usize,
}

impl ScopeScan {
    pub fn new(entries: Vec<ScopeEntry>) -> Self {
        Self {
            entries: entries.into(),
            pos: 0,
        }
    }

    /// Rewind to the first entry.
    pub fn restart(&mut self) {
        self.pos = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Iterator for ScopeScan {
    type Item = ScopeEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos)?.clone();
        self.pos += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScopeScan {}

impl FromIterator<ScopeEntry> for ScopeScan {
    fn from_iter<T: IntoIterator<Item = ScopeEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::Build;

    fn entry(id: &str) -> ScopeEntry {
        ScopeEntry::from_record(&Record::from(Build {
            id: id.into(),
            ..Build::default()
        }))
    }

    #[test]
    fn scan_is_finite_and_restartable() {
        let mut scan: ScopeScan = vec![entry("1"), entry("2")].into_iter().collect();
        assert_eq!(scan.len(), 2);
        assert_eq!(scan.next().map(|e| e.id), Some("1".to_string()));
        assert_eq!(scan.next().map(|e| e.id), Some("2".to_string()));
        assert!(scan.next().is_none());

        scan.restart();
        assert_eq!(scan.count(), 2);
    }

    #[test]
    fn clones_scan_independently() {
        let mut scan = ScopeScan::new(vec![entry("1")]);
        let copy = scan.clone();
        scan.next();
        assert_eq!(scan.size_hint(), (0, Some(0)));
        assert_eq!(copy.size_hint(), (1, Some(1)));
    }

    #[test]
    fn entry_carries_resolved_scope() {
        let e = entry("1");
        assert_eq!(e.kind, EntityKind::Build);
        assert_eq!(e.scope.workspace, "default");
    }
}
