use std::collections::BTreeMap;

use keel_store::{EntityStore, ScopeEntry, StoreResult};
use keel_types::{ApplicationRef, EntityKind, Scope, Workspace, WorkspaceMeta, WorkspaceProject};
use tracing::debug;

/// The workspace → project → application hierarchy seen in stored records.
///
/// Workspaces are keyed by name. Projects keep the order in which they were
/// first seen, as do the applications under each project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedHierarchy {
    workspaces: BTreeMap<String, Vec<WorkspaceProject>>,
}

impl DerivedHierarchy {
    /// Names of every workspace referenced by at least one record, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }

    pub fn contains(&self, workspace: &str) -> bool {
        self.workspaces.contains_key(workspace)
    }

    /// Derived projects of `workspace`; `None` if no record references it.
    pub fn projects(&self, workspace: &str) -> Option<&[WorkspaceProject]> {
        self.workspaces.get(workspace).map(Vec::as_slice)
    }

    /// Returns `true` if some record in `workspace` is scoped to `project`.
    pub fn has_project(&self, workspace: &str, project: &str) -> bool {
        self.projects(workspace)
            .is_some_and(|projects| projects.iter().any(|p| p.project.project == project))
    }

    /// Returns `true` if some record in `workspace` is scoped to exactly `app`.
    pub fn has_application(&self, workspace: &str, app: &ApplicationRef) -> bool {
        self.projects(workspace).is_some_and(|projects| {
            projects
                .iter()
                .filter(|p| p.project.project == app.project)
                .any(|p| p.applications.iter().any(|a| a.application == app.application))
        })
    }

    /// Merge the derived projects of `name` with its stored metadata.
    ///
    /// Derived projects come first. Seed projects from the metadata follow,
    /// unless a project of the same name was derived, in which case their
    /// applications are added to it.
    pub fn merge(&self, name: &str, meta: Option<&WorkspaceMeta>) -> Workspace {
        let mut workspace = Workspace::new(name);
        workspace.projects = self.projects(name).map(<[_]>::to_vec).unwrap_or_default();

        if let Some(meta) = meta {
            workspace.labels = meta.labels.clone();
            workspace.active_time = meta.active_time;

            for seed in &meta.seed_projects {
                let existing = workspace
                    .projects
                    .iter_mut()
                    .find(|p| p.project == seed.project);
                match existing {
                    Some(project) => {
                        for app in &seed.applications {
                            project.add_application(&app.application);
                        }
                    }
                    None => {
                        let mut project =
                            WorkspaceProject::new(name, seed.project.project.clone());
                        for app in &seed.applications {
                            project.add_application(&app.application);
                        }
                        workspace.projects.push(project);
                    }
                }
            }
        }

        workspace
    }
}

/// Folds record scopes into a [`DerivedHierarchy`].
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    hierarchy: DerivedHierarchy,
    observed: usize,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the hierarchy from every operational record in `store`.
    ///
    /// Kinds are scanned in [`EntityKind::OPERATIONAL`] order; triggers do
    /// not contribute.
    pub fn from_store<S: EntityStore + ?Sized>(store: &S) -> StoreResult<DerivedHierarchy> {
        let mut builder = Self::new();
        for kind in EntityKind::OPERATIONAL {
            builder.observe_all(store.scan_scopes(kind)?);
        }
        debug!(
            records = builder.observed,
            workspaces = builder.hierarchy.workspaces.len(),
            "workspace hierarchy derived"
        );
        Ok(builder.finish())
    }

    pub fn observe_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = ScopeEntry>,
    {
        for entry in entries {
            self.observe(&entry.scope);
        }
    }

    /// Record one scope. The workspace always becomes known; a project is
    /// added when the scope names one, and an application under it when the
    /// scope names that too.
    pub fn observe(&mut self, scope: &Scope) {
        self.observed += 1;
        let projects = self
            .hierarchy
            .workspaces
            .entry(scope.workspace.clone())
            .or_default();

        let Some(project_name) = scope.project.as_deref() else {
            return;
        };
        let index = match projects.iter().position(|p| p.project.project == project_name) {
            Some(index) => index,
            None => {
                projects.push(WorkspaceProject::new(scope.workspace.clone(), project_name));
                projects.len() - 1
            }
        };
        if let Some(application) = scope.application.as_deref() {
            projects[index].add_application(application);
        }
    }

    pub fn finish(self) -> DerivedHierarchy {
        self.hierarchy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::ProjectRef;

    fn scope(workspace: &str, project: Option<&str>, application: Option<&str>) -> Scope {
        Scope {
            workspace: workspace.into(),
            project: project.map(String::from),
            application: application.map(String::from),
        }
    }

    fn app_names(project: &WorkspaceProject) -> Vec<&str> {
        project
            .applications
            .iter()
            .map(|a| a.application.as_str())
            .collect()
    }

    #[test]
    fn empty_builder_has_no_workspaces() {
        let hierarchy = HierarchyBuilder::new().finish();
        assert_eq!(hierarchy.names().count(), 0);
        assert!(!hierarchy.contains("default"));
    }

    #[test]
    fn unscoped_record_adds_workspace_only() {
        let mut builder = HierarchyBuilder::new();
        builder.observe(&scope("default", None, None));
        let hierarchy = builder.finish();

        assert!(hierarchy.contains("default"));
        assert_eq!(hierarchy.projects("default").map(<[_]>::len), Some(0));
    }

    #[test]
    fn pairs_are_deduplicated_in_first_seen_order() {
        let mut builder = HierarchyBuilder::new();
        builder.observe(&scope("dev", Some("web"), Some("api")));
        builder.observe(&scope("dev", Some("db"), Some("pg")));
        builder.observe(&scope("dev", Some("web"), Some("frontend")));
        builder.observe(&scope("dev", Some("web"), Some("api")));
        let hierarchy = builder.finish();

        let projects = hierarchy.projects("dev").unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].project, ProjectRef::new("web"));
        assert_eq!(app_names(&projects[0]), ["api", "frontend"]);
        assert_eq!(app_names(&projects[1]), ["pg"]);
    }

    #[test]
    fn project_without_application_has_empty_list() {
        let mut builder = HierarchyBuilder::new();
        builder.observe(&scope("dev", Some("web"), None));
        let hierarchy = builder.finish();

        let projects = hierarchy.projects("dev").unwrap();
        assert_eq!(projects.len(), 1);
        assert!(projects[0].applications.is_empty());
        assert!(hierarchy.has_project("dev", "web"));
        assert!(!hierarchy.has_application("dev", &ApplicationRef::new("web", "")));
    }

    #[test]
    fn workspaces_are_partitioned() {
        let mut builder = HierarchyBuilder::new();
        builder.observe(&scope("1", Some("B"), Some("B")));
        builder.observe(&scope("2", Some("B"), Some("C")));
        let hierarchy = builder.finish();

        let b = ApplicationRef::new("B", "B");
        assert!(hierarchy.has_application("1", &b));
        assert!(!hierarchy.has_application("2", &b));
        assert!(hierarchy.has_project("2", "B"));
        assert_eq!(hierarchy.names().collect::<Vec<_>>(), ["1", "2"]);
    }

    #[test]
    fn merge_appends_seed_projects_after_derived() {
        let mut builder = HierarchyBuilder::new();
        builder.observe(&scope("staging", Some("web"), Some("api")));
        let hierarchy = builder.finish();

        let mut seed_web = WorkspaceProject::new("staging", "web");
        seed_web.add_application("worker");
        let meta = WorkspaceMeta {
            name: "staging".into(),
            seed_projects: vec![seed_web, WorkspaceProject::new("staging", "projectA")],
            ..WorkspaceMeta::default()
        };

        let merged = hierarchy.merge("staging", Some(&meta));
        assert_eq!(merged.projects.len(), 2);
        assert_eq!(app_names(&merged.projects[0]), ["api", "worker"]);
        assert_eq!(merged.projects[1].project, ProjectRef::new("projectA"));
    }

    #[test]
    fn merge_without_records_uses_metadata() {
        let hierarchy = DerivedHierarchy::default();
        let mut meta = WorkspaceMeta {
            name: "empty".into(),
            ..WorkspaceMeta::default()
        };
        meta.labels.insert("owner".into(), "ops".into());

        let merged = hierarchy.merge("empty", Some(&meta));
        assert_eq!(merged.name, "empty");
        assert!(merged.projects.is_empty());
        assert_eq!(merged.labels, meta.labels);
    }
}
