//! Workspace existence, listing and the derived hierarchy.

use anyhow::ensure;
use keel_store::EntityStoreExt;
use keel_types::{ApplicationRef, Build, Deployment, Trigger, Workspace, WorkspaceRef};
use keel_workspace::WorkspaceIndex;

use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{valid_build, valid_deployment, valid_trigger, TEST_PROJECT};

pub(super) const CASES: &[Case] = &[
    Case::new("list_empty", list_empty),
    Case::new("list_default_scoped", list_default_scoped),
    Case::new("get_missing", get_missing),
    Case::new("get_referenced", get_referenced),
    Case::new("put_then_get_valid_names", put_then_get_valid_names),
    Case::new("triggers_do_not_create_workspaces", triggers_do_not_create_workspaces),
    Case::new("list_sorted_by_name", list_sorted_by_name),
];

fn list_empty(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let list = store.workspace_list()?;
    ensure!(list.is_empty(), "fresh store lists workspaces {:?}", names(&list));
    Ok(())
}

fn list_default_scoped(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for id in ["1", "2"] {
        store.put_entity(valid_build(Build {
            id: id.into(),
            ..Build::default()
        }))?;
    }
    store.put_entity(valid_build(Build {
        id: "3".into(),
        application: Some(ApplicationRef::new("B", "B")),
        ..Build::default()
    }))?;
    store.put_entity(valid_deployment(Deployment {
        id: "1".into(),
        ..Deployment::default()
    }))?;

    let list = store.workspace_list()?;
    ensure!(list.len() == 1, "expected one workspace, got {:?}", names(&list));
    let default = &list[0];
    ensure!(default.name == "default", "workspace named {:?}", default.name);
    ensure!(
        default.projects.len() == 2,
        "expected 2 projects, got {}",
        default.projects.len()
    );
    for project in &default.projects {
        ensure!(
            project.applications.len() == 1,
            "project {} has {} applications",
            project.project,
            project.applications.len()
        );
    }
    ensure!(default.project(TEST_PROJECT).is_some(), "missing unscoped project");
    ensure!(default.project("B").is_some(), "missing project B");

    store.put_entity(valid_build(Build {
        id: "4".into(),
        workspace: Some(WorkspaceRef::new("2")),
        ..Build::default()
    }))?;
    let list = store.workspace_list()?;
    ensure!(list.len() == 2, "expected two workspaces, got {:?}", names(&list));
    Ok(())
}

fn get_missing(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        workspace: Some(WorkspaceRef::new("dev")),
        ..Build::default()
    }))?;

    match store.workspace_get("prod") {
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => anyhow::bail!("expected NotFound, got {err}"),
        Ok(ws) => anyhow::bail!("unknown workspace returned: {ws:?}"),
    }
}

fn get_referenced(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        workspace: Some(WorkspaceRef::new("dev")),
        application: Some(ApplicationRef::new("web", "api")),
        ..Build::default()
    }))?;

    let dev = store.workspace_get("dev")?;
    ensure!(dev.name == "dev", "workspace named {:?}", dev.name);
    let web = dev
        .project("web")
        .ok_or_else(|| anyhow::anyhow!("project web not derived"))?;
    ensure!(
        web.applications == [ApplicationRef::new("web", "api")],
        "applications {:?}",
        web.applications
    );
    Ok(())
}

fn put_then_get_valid_names(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for name in ["a", "Z", "staging", "prod1", "with-hyphen", "with_underscore", "a-b_c-9"] {
        let put = store.workspace_put(&Workspace::new(name))?;
        ensure!(put.name == name, "put {name:?} returned {:?}", put.name);
        let got = store.workspace_get(name)?;
        ensure!(got.name == name, "get {name:?} returned {:?}", got.name);
    }
    Ok(())
}

fn triggers_do_not_create_workspaces(
    factory: &dyn Factory,
    _: &dyn RestartFactory,
) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_trigger(Trigger {
        workspace: Some(WorkspaceRef::new("ci")),
        ..Trigger::default()
    }))?;

    let list = store.workspace_list()?;
    ensure!(list.is_empty(), "trigger created workspaces {:?}", names(&list));
    Ok(())
}

fn list_sorted_by_name(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        workspace: Some(WorkspaceRef::new("zeta")),
        ..Build::default()
    }))?;
    store.workspace_put(&Workspace::new("alpha"))?;
    store.put_entity(valid_deployment(Deployment {
        workspace: Some(WorkspaceRef::new("mid")),
        ..Deployment::default()
    }))?;

    let list = store.workspace_list()?;
    ensure!(
        names(&list) == ["alpha", "mid", "zeta"],
        "unexpected order {:?}",
        names(&list)
    );
    Ok(())
}
