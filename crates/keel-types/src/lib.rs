//! Foundation types for the Keel state layer.
//!
//! This crate provides the records that clients persist through the state
//! store and the views the workspace index derives from them. Every other
//! Keel crate depends on `keel-types`.
//!
//! # Key Types
//!
//! - [`WorkspaceRef`], [`ProjectRef`], [`ApplicationRef`]: scope references
//! - [`Build`], [`Deployment`], [`Release`], [`DestroyOp`]: operational records
//! - [`Trigger`]: a stored trigger definition with tags and an operation
//! - [`Record`]: tagged union over every storable kind
//! - [`Workspace`]: the merged workspace view with its derived projects
//! - [`WorkspaceMeta`]: the explicit, non-derivable workspace metadata

pub mod entity;
pub mod error;
pub mod names;
pub mod record;
pub mod refs;
pub mod trigger;
pub mod workspace;

pub use entity::{Build, Component, Deployment, DestroyOp, DestroyTarget, Release, Status, StatusState};
pub use error::TypeError;
pub use names::{validate_record_id, validate_workspace_name};
pub use record::{Entity, EntityKind, Record, Scope};
pub use refs::{resolve_workspace, ApplicationRef, ProjectRef, WorkspaceRef, DEFAULT_WORKSPACE};
pub use trigger::{Trigger, TriggerOperation};
pub use workspace::{Workspace, WorkspaceMeta, WorkspaceProject};
