//! Concurrent writers and readers on one store.

use std::collections::BTreeMap;
use std::thread;

use anyhow::{anyhow, ensure};
use keel_store::{EntityStoreExt, ListFilter, StateStore};
use keel_types::{ApplicationRef, Build, ProjectRef, WorkspaceRef};
use keel_workspace::WorkspaceIndex;

use super::{names, Case};
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::valid_build;

pub(super) const CASES: &[Case] = &[
    Case::new("partitioned_writers", partitioned_writers),
    Case::new("readers_see_whole_records", readers_see_whole_records),
];

const WRITERS: usize = 4;
const PUTS_PER_WRITER: usize = 20;
const VERSIONS: usize = 100;

fn join_all(handles: Vec<thread::ScopedJoinHandle<'_, anyhow::Result<()>>>) -> anyhow::Result<()> {
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))??;
    }
    Ok(())
}

fn partitioned_writers(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let store: &dyn StateStore = &*store;

    thread::scope(|s| {
        let handles = (0..WRITERS)
            .map(|w| {
                s.spawn(move || -> anyhow::Result<()> {
                    for i in 0..PUTS_PER_WRITER {
                        store.put_entity(valid_build(Build {
                            id: format!("w{w}-{i:03}"),
                            workspace: Some(WorkspaceRef::new(format!("ws{w}"))),
                            application: Some(ApplicationRef::new(format!("p{w}"), "app")),
                            ..Build::default()
                        }))?;
                    }
                    Ok(())
                })
            })
            .collect();
        join_all(handles)
    })?;

    let all: Vec<Build> = store.list_entities(&ListFilter::all())?;
    ensure!(
        all.len() == WRITERS * PUTS_PER_WRITER,
        "expected {} builds, found {}",
        WRITERS * PUTS_PER_WRITER,
        all.len()
    );

    for w in 0..WRITERS {
        let in_ws: Vec<Build> = store.list_entities(&ListFilter::all().workspace(format!("ws{w}")))?;
        ensure!(
            in_ws.len() == PUTS_PER_WRITER,
            "ws{w} holds {} builds",
            in_ws.len()
        );
        let prefix = format!("w{w}-");
        ensure!(
            in_ws.iter().all(|b| b.id.starts_with(&prefix)),
            "ws{w} holds builds of another writer"
        );

        let by_project = store.workspace_list_by_project(&ProjectRef::new(format!("p{w}")))?;
        let expected = format!("ws{w}");
        ensure!(
            names(&by_project) == [expected.as_str()],
            "project p{w} found in {:?}",
            names(&by_project)
        );
    }

    let list = store.workspace_list()?;
    ensure!(list.len() == WRITERS, "expected {WRITERS} workspaces, got {:?}", names(&list));
    Ok(())
}

fn readers_see_whole_records(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let store: &dyn StateStore = &*store;

    let version = |n: usize| {
        valid_build(Build {
            id: "shared".into(),
            sequence: n as u64,
            labels: BTreeMap::from([
                ("version".to_string(), n.to_string()),
                ("check".to_string(), n.to_string()),
            ]),
            ..Build::default()
        })
    };
    store.put_entity(version(1))?;

    let check = |build: &Build| -> anyhow::Result<()> {
        let seen = build.labels.get("version");
        ensure!(
            seen.is_some() && seen == build.labels.get("check"),
            "torn read: {:?}",
            build.labels
        );
        ensure!(
            seen == Some(&build.sequence.to_string()),
            "labels and sequence disagree: {build:?}"
        );
        Ok(())
    };

    thread::scope(|s| {
        let writer = s.spawn(move || -> anyhow::Result<()> {
            for n in 2..=VERSIONS {
                store.put_entity(version(n))?;
            }
            Ok(())
        });
        let readers = (0..WRITERS)
            .map(|_| {
                s.spawn(move || -> anyhow::Result<()> {
                    for _ in 0..VERSIONS {
                        check(&store.get_entity::<Build>("shared")?)?;
                        let listed: Vec<Build> = store.list_entities(&ListFilter::all())?;
                        ensure!(listed.len() == 1, "listed {} builds", listed.len());
                        check(&listed[0])?;
                    }
                    Ok(())
                })
            })
            .chain(std::iter::once(writer))
            .collect();
        join_all(readers)
    })?;

    let last: Build = store.get_entity("shared")?;
    ensure!(
        last.sequence == VERSIONS as u64,
        "last write lost: sequence {}",
        last.sequence
    );
    Ok(())
}
