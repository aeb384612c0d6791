//! List filters.
//!
//! A [`ListFilter`] is a conjunction: a record matches only if it satisfies
//! every criterion that is set.

use std::collections::BTreeSet;

use keel_types::{resolve_workspace, ApplicationRef, ProjectRef, Record, WorkspaceRef};

/// Conjunctive filter over scope and tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub workspace: Option<WorkspaceRef>,
    pub project: Option<ProjectRef>,
    pub application: Option<ApplicationRef>,
    /// Every tag must be present on the record. Only triggers carry tags.
    pub tags: BTreeSet<String>,
}

impl ListFilter {
    /// A filter that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(WorkspaceRef::new(workspace));
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(ProjectRef::new(project));
        self
    }

    pub fn application(mut self, project: impl Into<String>, application: impl Into<String>) -> Self {
        self.application = Some(ApplicationRef::new(project, application));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        let scope = record.scope();

        if let Some(ws) = &self.workspace {
            if scope.workspace != resolve_workspace(Some(ws)) {
                return false;
            }
        }

        if let Some(project) = &self.project {
            if !scope.matches_project(&project.project) {
                return false;
            }
        }

        if let Some(app) = &self.application {
            // An application filter without a project matches the name alone.
            let app_matches = if app.project.is_empty() {
                scope.application.as_deref() == Some(app.application.as_str())
            } else {
                scope.matches_app(app)
            };
            if !app_matches {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let tags: BTreeSet<&String> = record.tags().collect();
            if !self.tags.iter().all(|t| tags.contains(t)) {
                return false;
            }
        }

        true
    }
}

/// Request shape used by the command layer to list triggers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListTriggerRequest {
    pub tags: Vec<String>,
    pub workspace: Option<WorkspaceRef>,
    pub project: Option<ProjectRef>,
    pub application: Option<ApplicationRef>,
}

impl From<ListTriggerRequest> for ListFilter {
    fn from(req: ListTriggerRequest) -> Self {
        Self {
            workspace: req.workspace,
            project: req.project,
            application: req.application,
            tags: req.tags.into_iter().collect(),
        }
    }
}
