//! Explicit workspace metadata: naming rules, overwrite and preservation.

use anyhow::ensure;
use keel_store::EntityStoreExt;
use keel_types::{Build, Workspace, WorkspaceRef};
use keel_workspace::WorkspaceIndex;

use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{at, valid_build};

pub(super) const CASES: &[Case] = &[
    Case::new("default_needs_put", default_needs_put),
    Case::new("multi_list", multi_list),
    Case::new("rejects_invalid_names", rejects_invalid_names),
    Case::new("preserves_projects", preserves_projects),
    Case::new("overwrites_metadata", overwrites_metadata),
    Case::new("idempotent", idempotent),
    Case::new("returns_derived_projects", returns_derived_projects),
];

const INVALID_NAMES: &[&str] = &[
    "",
    " ",
    "has space",
    " leading",
    "trailing ",
    "-leading",
    "trailing-",
    "_leading",
    "trailing_",
    "-",
    "_",
    "dot.ted",
    "slash/ed",
];

fn default_needs_put(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    match store.workspace_get("default") {
        Err(err) if err.is_not_found() => {}
        Err(err) => anyhow::bail!("expected NotFound for default, got {err}"),
        Ok(ws) => anyhow::bail!("fresh store already has {ws:?}"),
    }

    store.workspace_put(&Workspace::new("default"))?;
    let default = store.workspace_get("default")?;
    ensure!(default.name == "default", "read back {:?}", default.name);
    Ok(())
}

fn multi_list(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for name in ["staging", "default", "dev"] {
        store.workspace_put(&Workspace::new(name))?;
    }

    let list = store.workspace_list()?;
    ensure!(
        names(&list) == ["default", "dev", "staging"],
        "listed {:?}",
        names(&list)
    );
    Ok(())
}

fn rejects_invalid_names(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for name in INVALID_NAMES {
        match store.workspace_put(&Workspace::new(*name)) {
            Err(err) if err.is_invalid() => {}
            Err(err) => anyhow::bail!("{name:?}: expected Invalid, got {err}"),
            Ok(_) => anyhow::bail!("{name:?}: accepted an invalid name"),
        }
    }
    let list = store.workspace_list()?;
    ensure!(list.is_empty(), "rejected puts stored {:?}", names(&list));
    Ok(())
}

fn preserves_projects(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.workspace_put(&Workspace::new("staging").with_project("projectA", &[]))?;
    store.workspace_put(&Workspace::new("staging"))?;

    let staging = store.workspace_get("staging")?;
    ensure!(
        staging.projects.len() == 1,
        "expected 1 project, got {:?}",
        staging.projects
    );
    ensure!(staging.project("projectA").is_some(), "projectA lost");
    Ok(())
}

fn overwrites_metadata(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let mut first = Workspace::new("staging");
    first.labels.insert("tier".into(), "gold".into());
    first.labels.insert("owner".into(), "ops".into());
    first.active_time = Some(at(1_709_283_600)?);
    store.workspace_put(&first)?;

    let mut second = Workspace::new("staging");
    second.labels.insert("tier".into(), "silver".into());
    second.active_time = Some(at(1_709_370_000)?);
    store.workspace_put(&second)?;

    let staging = store.workspace_get("staging")?;
    ensure!(staging.labels == second.labels, "labels {:?}", staging.labels);
    ensure!(
        staging.active_time == second.active_time,
        "active time {:?}",
        staging.active_time
    );
    Ok(())
}

fn idempotent(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let mut ws = Workspace::new("dev").with_project("web", &["api"]);
    ws.labels.insert("tier".into(), "gold".into());

    let first = store.workspace_put(&ws)?;
    let second = store.workspace_put(&ws)?;
    ensure!(first == second, "repeated put changed the view: {first:?} vs {second:?}");
    ensure!(store.workspace_list()?.len() == 1, "repeated put duplicated the workspace");
    Ok(())
}

fn returns_derived_projects(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        workspace: Some(WorkspaceRef::new("dev")),
        ..Build::default()
    }))?;

    // Projects supplied on a later put are not taken from the input.
    store.workspace_put(&Workspace::new("dev"))?;
    let returned = store.workspace_put(&Workspace::new("dev").with_project("ignored", &[]))?;
    ensure!(
        returned.projects.len() == 1,
        "expected only the derived project, got {:?}",
        returned.projects
    );
    ensure!(returned.project("ignored").is_none(), "input projects were stored");
    Ok(())
}
