//! Durability across a close and reopen of the same medium.

use anyhow::{anyhow, ensure};
use keel_store::{EntityStore, EntityStoreExt, ListFilter};
use keel_types::{
    ApplicationRef, Build, EntityKind, Trigger, TriggerOperation, Workspace, WorkspaceRef,
};
use keel_workspace::WorkspaceIndex;

use super::entity::sample_records;
use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{tagged_trigger, valid_build};

pub(super) const CASES: &[Case] = &[
    Case::durable("records_survive", records_survive),
    Case::durable("last_write_wins", last_write_wins),
    Case::durable("triggers_survive", triggers_survive),
    Case::durable("workspace_survives", workspace_survives),
    Case::durable("writes_after_restart", writes_after_restart),
];

fn records_survive(factory: &dyn Factory, restart: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let records = sample_records()?;
    for record in &records {
        store.put(record)?;
    }

    let store = restart.restart(store)?;
    for record in &records {
        let read_back = store.get(record.kind(), record.id())?;
        ensure!(
            &read_back == record,
            "{} {} changed across restart: {read_back:?}",
            record.kind(),
            record.id()
        );
    }
    Ok(())
}

fn last_write_wins(factory: &dyn Factory, restart: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for sequence in 1..=5 {
        store.put_entity(valid_build(Build {
            id: "1".into(),
            sequence,
            workspace: Some(WorkspaceRef::new(format!("ws{sequence}"))),
            ..Build::default()
        }))?;
    }

    let store = restart.restart(store)?;
    let build: Build = store.get_entity("1")?;
    ensure!(build.sequence == 5, "restart restored sequence {}", build.sequence);
    let scopes = store.scan_scopes(EntityKind::Build)?;
    ensure!(scopes.len() == 1, "restart restored {} scope entries", scopes.len());
    let list = store.workspace_list()?;
    ensure!(names(&list) == ["ws5"], "stale workspaces {:?}", names(&list));
    Ok(())
}

fn triggers_survive(factory: &dyn Factory, restart: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let trigger = tagged_trigger(TriggerOperation::Release, &["prod", "web"]);
    store.put_entity(trigger.clone())?;

    let store = restart.restart(store)?;
    let found: Vec<Trigger> = store.list_entities(&ListFilter::all().tag("web"))?;
    ensure!(found == [trigger], "trigger lost or changed: {found:?}");
    Ok(())
}

fn workspace_survives(factory: &dyn Factory, restart: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        workspace: Some(WorkspaceRef::new("staging")),
        application: Some(ApplicationRef::new("web", "api")),
        ..Build::default()
    }))?;
    let mut staging = Workspace::new("staging").with_project("projectA", &[]);
    staging.labels.insert("tier".into(), "gold".into());
    let before = store.workspace_put(&staging)?;

    let store = restart.restart(store)?;
    let after = store.workspace_get("staging")?;
    ensure!(after == before, "workspace changed across restart: {after:?}");

    store.workspace_put(&Workspace::new("staging"))?;
    let store = restart.restart(store)?;
    let after = store.workspace_get("staging")?;
    ensure!(
        after.project("projectA").is_some() && after.project("web").is_some(),
        "projects lost across restart: {:?}",
        after.projects
    );
    ensure!(after.labels.is_empty(), "labels not overwritten: {:?}", after.labels);
    Ok(())
}

fn writes_after_restart(factory: &dyn Factory, restart: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        id: "before".into(),
        ..Build::default()
    }))?;

    let store = restart.restart(store)?;
    store.put_entity(valid_build(Build {
        id: "after".into(),
        ..Build::default()
    }))?;

    let store = restart.restart(store)?;
    let ids: Vec<String> = store
        .list(EntityKind::Build, &ListFilter::all())?
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    ensure!(ids == ["after", "before"], "after two restarts found {ids:?}");
    store
        .get_entity::<Build>("before")
        .map_err(|e| anyhow!("first write lost: {e}"))?;
    Ok(())
}
