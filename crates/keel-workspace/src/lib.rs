//! Workspace aggregation for Keel.
//!
//! A workspace has no stored project list. Its projects and applications
//! are derived on every read from the scopes of the operational records in
//! an entity store, then merged with the small amount of explicit metadata
//! kept by [`WorkspacePut`](WorkspaceIndex::workspace_put).
//!
//! This crate provides:
//! - [`HierarchyBuilder`] / [`DerivedHierarchy`]: the deterministic
//!   derivation of workspace → project → application from scope scans
//! - [`WorkspaceIndex`]: get, list, list-by-project, list-by-app and put,
//!   available on every [`StateStore`](keel_store::StateStore)

pub mod hierarchy;
pub mod index;

pub use hierarchy::{DerivedHierarchy, HierarchyBuilder};
pub use index::WorkspaceIndex;
