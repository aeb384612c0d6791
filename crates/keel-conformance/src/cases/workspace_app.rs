//! Listing workspaces by application.

use anyhow::ensure;
use keel_store::EntityStoreExt;
use keel_types::{ApplicationRef, Deployment, DestroyOp, WorkspaceRef};
use keel_workspace::WorkspaceIndex;

use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{valid_deployment, valid_destroy};

pub(super) const CASES: &[Case] = &[
    Case::new("empty", empty),
    Case::new("exact_pair_only", exact_pair_only),
    Case::new("narrows_to_project", narrows_to_project),
];

fn scoped_deployment(workspace: &str, project: &str, application: &str) -> Deployment {
    valid_deployment(Deployment {
        workspace: Some(WorkspaceRef::new(workspace)),
        application: Some(ApplicationRef::new(project, application)),
        ..Deployment::default()
    })
}

fn empty(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let found = store.workspace_list_by_app(&ApplicationRef::new("B", "B"))?;
    ensure!(found.is_empty(), "empty store matched {:?}", names(&found));
    Ok(())
}

fn exact_pair_only(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(scoped_deployment("1", "B", "B"))?;
    store.put_entity(scoped_deployment("2", "B", "C"))?;
    store.put_entity(scoped_deployment("3", "C", "B"))?;

    let found = store.workspace_list_by_app(&ApplicationRef::new("B", "B"))?;
    ensure!(names(&found) == ["1"], "expected workspace 1, got {:?}", names(&found));

    store.put_entity(valid_destroy(DestroyOp {
        workspace: Some(WorkspaceRef::new("2")),
        application: Some(ApplicationRef::new("B", "B")),
        ..DestroyOp::default()
    }))?;
    let found = store.workspace_list_by_app(&ApplicationRef::new("B", "B"))?;
    ensure!(names(&found) == ["1", "2"], "unexpected match {:?}", names(&found));
    Ok(())
}

fn narrows_to_project(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(scoped_deployment("1", "B", "B"))?;
    store.put_entity(scoped_deployment("1", "B", "worker"))?;
    store.put_entity(scoped_deployment("1", "C", "C"))?;

    let found = store.workspace_list_by_app(&ApplicationRef::new("B", "B"))?;
    ensure!(found.len() == 1, "expected one workspace, got {:?}", names(&found));
    let projects = &found[0].projects;
    ensure!(projects.len() == 1, "projects not narrowed: {projects:?}");
    ensure!(
        projects[0].applications.len() == 2,
        "applications under B were narrowed: {:?}",
        projects[0].applications
    );
    Ok(())
}
