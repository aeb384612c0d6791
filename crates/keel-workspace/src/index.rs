use std::collections::BTreeSet;

use keel_store::{StateStore, StoreError, StoreResult};
use keel_types::{validate_workspace_name, ApplicationRef, ProjectRef, Workspace, WorkspaceMeta};
use tracing::{debug, info};

use crate::hierarchy::{DerivedHierarchy, HierarchyBuilder};

/// Workspace operations over a state store.
///
/// Every read recomputes the derived hierarchy from the current contents of
/// the store, so a record becomes visible here as soon as its `put` returns.
/// Workspaces are returned sorted by name.
pub trait WorkspaceIndex: StateStore {
    /// The merged view of one workspace.
    ///
    /// Returns `NotFound` if the workspace was never put and no record
    /// references it.
    fn workspace_get(&self, name: &str) -> StoreResult<Workspace> {
        let hierarchy = HierarchyBuilder::from_store(self)?;
        let meta = self.get_workspace_meta(name)?;
        if meta.is_none() && !hierarchy.contains(name) {
            return Err(StoreError::not_found("workspace", name));
        }
        Ok(hierarchy.merge(name, meta.as_ref()))
    }

    /// Every workspace that was put or is referenced by a record.
    fn workspace_list(&self) -> StoreResult<Vec<Workspace>> {
        let hierarchy = HierarchyBuilder::from_store(self)?;
        let metas = self.list_workspace_meta()?;

        let names: BTreeSet<&str> = hierarchy
            .names()
            .chain(metas.iter().map(|m| m.name.as_str()))
            .collect();
        let workspaces: Vec<Workspace> = names
            .into_iter()
            .map(|name| hierarchy.merge(name, metas.iter().find(|m| m.name == name)))
            .collect();
        debug!(count = workspaces.len(), "workspace list");
        Ok(workspaces)
    }

    /// Workspaces holding at least one record scoped to `project`, each with
    /// its projects narrowed to that project.
    fn workspace_list_by_project(&self, project: &ProjectRef) -> StoreResult<Vec<Workspace>> {
        let hierarchy = HierarchyBuilder::from_store(self)?;
        narrowed(self, &hierarchy, &project.project, |name| {
            hierarchy.has_project(name, &project.project)
        })
    }

    /// Workspaces holding at least one record scoped to exactly `app`, each
    /// with its projects narrowed to the app's project.
    fn workspace_list_by_app(&self, app: &ApplicationRef) -> StoreResult<Vec<Workspace>> {
        let hierarchy = HierarchyBuilder::from_store(self)?;
        narrowed(self, &hierarchy, &app.project, |name| {
            hierarchy.has_application(name, app)
        })
    }

    /// Store the explicit metadata of `workspace` and return the merged view.
    ///
    /// The name must satisfy the workspace-name rules, otherwise `Invalid`.
    /// Labels and active time are overwritten. Projects in `workspace` are
    /// only kept when the name is put for the first time.
    fn workspace_put(&self, workspace: &Workspace) -> StoreResult<Workspace> {
        validate_workspace_name(&workspace.name)?;
        let meta = self.update_workspace_meta(&workspace.name, &|previous| {
            WorkspaceMeta::from_put(workspace, previous)
        })?;
        info!(
            workspace = %meta.name,
            seed_projects = meta.seed_projects.len(),
            "workspace put"
        );

        let hierarchy = HierarchyBuilder::from_store(self)?;
        Ok(hierarchy.merge(&meta.name, Some(&meta)))
    }
}

impl<S: StateStore + ?Sized> WorkspaceIndex for S {}

fn narrowed<S, F>(
    store: &S,
    hierarchy: &DerivedHierarchy,
    project: &str,
    is_member: F,
) -> StoreResult<Vec<Workspace>>
where
    S: StateStore + ?Sized,
    F: Fn(&str) -> bool,
{
    let mut workspaces = Vec::new();
    for name in hierarchy.names().filter(|name| is_member(name)) {
        let meta = store.get_workspace_meta(name)?;
        let mut workspace = hierarchy.merge(name, meta.as_ref());
        workspace.projects.retain(|p| p.project.project == project);
        workspaces.push(workspace);
    }
    debug!(project, count = workspaces.len(), "workspace scoped list");
    Ok(workspaces)
}
