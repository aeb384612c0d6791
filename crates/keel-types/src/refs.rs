//! Scope references attached to records.
//!
//! A record is scoped by an optional workspace and an optional
//! project/application pair. An absent or empty workspace means the implicit
//! [`DEFAULT_WORKSPACE`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the workspace a record belongs to when it names none.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Reference to a workspace by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub workspace: String,
}

impl WorkspaceRef {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// The reference for the implicit default workspace.
    pub fn default_workspace() -> Self {
        Self::new(DEFAULT_WORKSPACE)
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.workspace)
    }
}

/// Reference to a project by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub project: String,
}

impl ProjectRef {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.project)
    }
}

/// Reference to an application, always qualified by its project.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationRef {
    pub project: String,
    pub application: String,
}

impl ApplicationRef {
    pub fn new(project: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            application: application.into(),
        }
    }

    /// The project this application lives in.
    pub fn project_ref(&self) -> ProjectRef {
        ProjectRef::new(self.project.clone())
    }
}

impl fmt::Display for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.application)
    }
}

/// Resolve an optional workspace reference to a concrete workspace name.
pub fn resolve_workspace(workspace: Option<&WorkspaceRef>) -> &str {
    match workspace {
        Some(w) if !w.workspace.is_empty() => &w.workspace,
        _ => DEFAULT_WORKSPACE,
    }
}
