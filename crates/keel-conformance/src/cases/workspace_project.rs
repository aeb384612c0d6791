//! Listing workspaces by project.

use anyhow::ensure;
use keel_store::EntityStoreExt;
use keel_types::{ApplicationRef, Build, ProjectRef, Release, WorkspaceRef};
use keel_workspace::WorkspaceIndex;

use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{valid_build, valid_release};

pub(super) const CASES: &[Case] = &[
    Case::new("empty", empty),
    Case::new("partitions_workspaces", partitions_workspaces),
    Case::new("narrows_projects", narrows_projects),
    Case::new("counts_every_kind", counts_every_kind),
];

fn scoped_build(workspace: &str, project: &str, application: &str) -> Build {
    valid_build(Build {
        workspace: Some(WorkspaceRef::new(workspace)),
        application: Some(ApplicationRef::new(project, application)),
        ..Build::default()
    })
}

fn empty(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(found.is_empty(), "empty store matched {:?}", names(&found));

    store.put_entity(scoped_build("1", "C", "C"))?;
    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(found.is_empty(), "unrelated project matched {:?}", names(&found));
    Ok(())
}

fn partitions_workspaces(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        id: "3".into(),
        workspace: Some(WorkspaceRef::new("1")),
        application: Some(ApplicationRef::new("B", "B")),
        ..Build::default()
    }))?;

    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(names(&found) == ["1"], "expected workspace 1, got {:?}", names(&found));
    ensure!(
        found[0].projects.len() == 1,
        "expected one project, got {:?}",
        found[0].projects
    );

    store.put_entity(scoped_build("2", "B", "other"))?;
    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(found.len() == 2, "expected two workspaces, got {:?}", names(&found));
    Ok(())
}

fn narrows_projects(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(scoped_build("1", "B", "B"))?;
    store.put_entity(scoped_build("1", "B", "worker"))?;
    store.put_entity(scoped_build("1", "C", "C"))?;

    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(found.len() == 1, "expected one workspace, got {:?}", names(&found));
    let projects = &found[0].projects;
    ensure!(projects.len() == 1, "projects not narrowed: {projects:?}");
    ensure!(
        projects[0].project == ProjectRef::new("B"),
        "wrong project {}",
        projects[0].project
    );
    ensure!(
        projects[0].applications.len() == 2,
        "applications under B were narrowed: {:?}",
        projects[0].applications
    );
    Ok(())
}

fn counts_every_kind(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_release(Release {
        workspace: Some(WorkspaceRef::new("prod")),
        application: Some(ApplicationRef::new("B", "B")),
        ..Release::default()
    }))?;

    let found = store.workspace_list_by_project(&ProjectRef::new("B"))?;
    ensure!(names(&found) == ["prod"], "release not counted: {:?}", names(&found));
    Ok(())
}
