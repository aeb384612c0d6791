//! Workspace views and stored workspace metadata.
//!
//! A [`Workspace`] is a hybrid: its `projects` are derived from the records
//! scoped to it, while `labels` and `active_time` are explicit metadata kept
//! in a [`WorkspaceMeta`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refs::{ApplicationRef, ProjectRef, WorkspaceRef};

/// A project inside a workspace, with the applications seen under it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceProject {
    pub project: ProjectRef,
    pub workspace: WorkspaceRef,
    pub applications: Vec<ApplicationRef>,
}

impl WorkspaceProject {
    pub fn new(workspace: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            project: ProjectRef::new(project),
            workspace: WorkspaceRef::new(workspace),
            applications: Vec::new(),
        }
    }

    /// Add an application unless it is already listed. Keeps insertion order.
    pub fn add_application(&mut self, application: &str) {
        if application.is_empty()
            || self
                .applications
                .iter()
                .any(|a| a.application == application)
        {
            return;
        }
        self.applications
            .push(ApplicationRef::new(self.project.project.clone(), application));
    }
}

/// The merged workspace view returned to callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub projects: Vec<WorkspaceProject>,
    pub labels: BTreeMap<String, String>,
    pub active_time: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to seed a project (and optionally applications).
    pub fn with_project(mut self, project: &str, applications: &[&str]) -> Self {
        let mut entry = WorkspaceProject::new(self.name.clone(), project);
        for app in applications {
            entry.add_application(app);
        }
        self.projects.push(entry);
        self
    }

    pub fn project(&self, name: &str) -> Option<&WorkspaceProject> {
        self.projects.iter().find(|p| p.project.project == name)
    }

    pub fn reference(&self) -> WorkspaceRef {
        WorkspaceRef::new(self.name.clone())
    }
}

/// Explicit workspace metadata as stored by the backend.
///
/// `seed_projects` holds the projects a caller supplied when the workspace
/// was first put. They are never replaced by later puts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub active_time: Option<DateTime<Utc>>,
    pub seed_projects: Vec<WorkspaceProject>,
}

impl WorkspaceMeta {
    /// Build the metadata to store for `workspace`, given what was stored
    /// before under the same name.
    pub fn from_put(workspace: &Workspace, previous: Option<&WorkspaceMeta>) -> Self {
        let seed_projects = match previous {
            Some(prev) => prev.seed_projects.clone(),
            None => workspace
                .projects
                .iter()
                .filter(|p| !p.project.project.is_empty())
                .map(|p| {
                    let mut seed =
                        WorkspaceProject::new(workspace.name.clone(), p.project.project.clone());
                    for app in &p.applications {
                        seed.add_application(&app.application);
                    }
                    seed
                })
                .collect(),
        };

        Self {
            name: workspace.name.clone(),
            labels: workspace.labels.clone(),
            active_time: workspace.active_time,
            seed_projects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_application_dedups() {
        let mut project = WorkspaceProject::new("default", "web");
        project.add_application("api");
        project.add_application("api");
        project.add_application("");
        project.add_application("frontend");
        let names: Vec<_> = project.applications.iter().map(|a| a.application.as_str()).collect();
        assert_eq!(names, ["api", "frontend"]);
        assert_eq!(project.applications[0].project, "web");
    }

    #[test]
    fn first_put_seeds_projects() {
        let ws = Workspace::new("staging").with_project("projectA", &[]);
        let meta = WorkspaceMeta::from_put(&ws, None);
        assert_eq!(meta.seed_projects.len(), 1);
        assert_eq!(meta.seed_projects[0].workspace.workspace, "staging");
    }

    #[test]
    fn later_put_keeps_seed_and_overwrites_labels() {
        let mut first = Workspace::new("staging").with_project("projectA", &["api"]);
        first.labels.insert("tier".into(), "gold".into());
        let stored = WorkspaceMeta::from_put(&first, None);

        let mut second = Workspace::new("staging").with_project("projectB", &[]);
        second.labels.insert("tier".into(), "silver".into());
        let updated = WorkspaceMeta::from_put(&second, Some(&stored));

        assert_eq!(updated.seed_projects, stored.seed_projects);
        assert_eq!(updated.labels.get("tier").map(String::as_str), Some("silver"));
    }

    #[test]
    fn project_lookup() {
        let ws = Workspace::new("dev").with_project("web", &["api"]);
        assert!(ws.project("web").is_some());
        assert!(ws.project("db").is_none());
        assert_eq!(ws.reference(), WorkspaceRef::new("dev"));
    }
}
