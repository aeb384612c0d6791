//! Put, get, list and scope scans over the operational kinds.

use std::collections::BTreeMap;

use anyhow::{bail, ensure};
use keel_store::{EntityStore, EntityStoreExt, ListFilter};
use keel_types::{
    ApplicationRef, Build, Component, Deployment, DestroyOp, DestroyTarget, EntityKind, Record,
    Release, Status, StatusState, WorkspaceRef,
};

use super::Case;
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{at, valid_build, valid_deployment, valid_destroy, valid_release};

pub(super) const CASES: &[Case] = &[
    Case::new("list_empty", list_empty),
    Case::new("roundtrip_every_kind", roundtrip_every_kind),
    Case::new("get_missing", get_missing),
    Case::new("kinds_are_separate", kinds_are_separate),
    Case::new("put_replaces_whole_record", put_replaces_whole_record),
    Case::new("invalid_put_keeps_previous", invalid_put_keeps_previous),
    Case::new("list_filters_by_scope", list_filters_by_scope),
    Case::new("list_ordered_by_id", list_ordered_by_id),
    Case::new("scan_scopes", scan_scopes),
];

fn list_empty(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for kind in EntityKind::ALL {
        let records = store.list(kind, &ListFilter::all())?;
        ensure!(records.is_empty(), "fresh store lists {} {kind} records", records.len());
        ensure!(store.scan_scopes(kind)?.is_empty(), "fresh store scans {kind} scopes");
    }
    Ok(())
}

fn roundtrip_every_kind(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let records = sample_records()?;
    for record in &records {
        store.put(record)?;
    }
    for record in &records {
        let read_back = store.get(record.kind(), record.id())?;
        ensure!(
            &read_back == record,
            "{} {} changed in storage: {read_back:?}",
            record.kind(),
            record.id()
        );
    }
    Ok(())
}

/// One fully populated record of every operational kind.
pub(super) fn sample_records() -> anyhow::Result<Vec<Record>> {
    let status = Status {
        state: StatusState::Success,
        details: "done".into(),
        start_time: Some(at(1_700_000_000)?),
        complete_time: Some(at(1_700_000_060)?),
    };
    let scope = Some(ApplicationRef::new("web", "api"));
    let workspace = Some(WorkspaceRef::new("prod"));
    let component = Some(Component {
        kind: "builder".into(),
        name: "docker".into(),
    });

    Ok(vec![
        Record::from(valid_build(Build {
            id: "b1".into(),
            workspace: workspace.clone(),
            application: scope.clone(),
            sequence: 42,
            component: component.clone(),
            labels: BTreeMap::from([("commit".to_string(), "abc123".to_string())]),
            status: Some(status.clone()),
        })),
        Record::from(valid_deployment(Deployment {
            id: "d1".into(),
            workspace: workspace.clone(),
            application: scope.clone(),
            sequence: 7,
            artifact_id: "b1".into(),
            component,
            status: Some(status.clone()),
            ..Deployment::default()
        })),
        Record::from(valid_release(Release {
            id: "r1".into(),
            workspace: workspace.clone(),
            application: scope.clone(),
            sequence: 3,
            deployment_id: "d1".into(),
            url: Some("https://api.example.test".into()),
            status: Some(status.clone()),
            ..Release::default()
        })),
        Record::from(valid_destroy(DestroyOp {
            id: "x1".into(),
            workspace,
            application: scope,
            target: DestroyTarget::Deployment("d1".into()),
            status: Some(status),
            ..DestroyOp::default()
        })),
    ])
}

fn get_missing(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for kind in EntityKind::ALL {
        match store.get(kind, "missing") {
            Err(err) if err.is_not_found() => {}
            Err(err) => bail!("{kind}: expected NotFound, got {err}"),
            Ok(record) => bail!("{kind}: found {record:?} in an empty store"),
        }
    }
    Ok(())
}

fn kinds_are_separate(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_build(Build {
        id: "1".into(),
        ..Build::default()
    }))?;
    store.put_entity(valid_deployment(Deployment {
        id: "1".into(),
        ..Deployment::default()
    }))?;

    ensure!(store.get_entity::<Build>("1").is_ok(), "build 1 lost");
    ensure!(store.get_entity::<Deployment>("1").is_ok(), "deployment 1 lost");
    ensure!(
        store.get_entity::<Release>("1").is_err(),
        "release 1 found without a put"
    );
    Ok(())
}

fn put_replaces_whole_record(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let mut first = valid_build(Build {
        id: "1".into(),
        workspace: Some(WorkspaceRef::new("dev")),
        ..Build::default()
    });
    first.labels.insert("keep".into(), "no".into());
    store.put_entity(first)?;

    let second = valid_build(Build {
        id: "1".into(),
        sequence: 2,
        ..Build::default()
    });
    store.put_entity(second.clone())?;

    let read_back: Build = store.get_entity("1")?;
    ensure!(read_back == second, "fields merged into the new version: {read_back:?}");
    let all = store.list(EntityKind::Build, &ListFilter::all())?;
    ensure!(all.len() == 1, "overwrite produced {} records", all.len());
    Ok(())
}

fn invalid_put_keeps_previous(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let original = valid_build(Build {
        id: "1".into(),
        ..Build::default()
    });
    store.put_entity(original.clone())?;

    let invalid = [
        Build {
            id: "1".into(),
            workspace: Some(WorkspaceRef::new("bad name")),
            ..original.clone()
        },
        Build {
            id: "1".into(),
            application: Some(ApplicationRef::new("", "orphan")),
            ..original.clone()
        },
        Build {
            id: String::new(),
            ..original.clone()
        },
        Build {
            id: "with space".into(),
            ..original.clone()
        },
    ];
    for build in invalid {
        match store.put_entity(build.clone()) {
            Err(err) if err.is_invalid() => {}
            Err(err) => bail!("{:?}: expected Invalid, got {err}", build.id),
            Ok(()) => bail!("{:?}: invalid build accepted", build.id),
        }
    }

    let read_back: Build = store.get_entity("1")?;
    ensure!(read_back == original, "failed put changed the record: {read_back:?}");
    Ok(())
}

fn list_filters_by_scope(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let scoped = |id: &str, ws: Option<&str>, project: &str, app: &str| {
        valid_build(Build {
            id: id.into(),
            workspace: ws.map(WorkspaceRef::new),
            application: Some(ApplicationRef::new(project, app)),
            ..Build::default()
        })
    };
    store.put_entity(scoped("1", None, "web", "api"))?;
    store.put_entity(scoped("2", Some("prod"), "web", "api"))?;
    store.put_entity(scoped("3", Some("prod"), "web", "worker"))?;
    store.put_entity(scoped("4", Some("prod"), "db", "api"))?;

    let cases = [
        (ListFilter::all(), vec!["1", "2", "3", "4"]),
        (ListFilter::all().workspace("default"), vec!["1"]),
        (ListFilter::all().workspace("prod"), vec!["2", "3", "4"]),
        (ListFilter::all().project("web"), vec!["1", "2", "3"]),
        (ListFilter::all().application("web", "api"), vec!["1", "2"]),
        (
            ListFilter::all().workspace("prod").application("web", "api"),
            vec!["2"],
        ),
        (ListFilter::all().workspace("prod").project("db"), vec!["4"]),
        (ListFilter::all().workspace("staging"), vec![]),
    ];
    for (filter, expected) in cases {
        let ids: Vec<String> = store
            .list(EntityKind::Build, &filter)?
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        ensure!(ids == expected, "filter {filter:?} listed {ids:?}, expected {expected:?}");
    }
    Ok(())
}

fn list_ordered_by_id(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    for id in ["c", "a", "d", "b"] {
        store.put_entity(valid_release(Release {
            id: id.into(),
            ..Release::default()
        }))?;
    }
    let first: Vec<Release> = store.list_entities(&ListFilter::all())?;
    let second: Vec<Release> = store.list_entities(&ListFilter::all())?;
    let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    ensure!(ids == ["a", "b", "c", "d"], "unexpected order {ids:?}");
    ensure!(first == second, "list order is not stable");
    Ok(())
}

fn scan_scopes(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_destroy(DestroyOp {
        id: "1".into(),
        workspace: Some(WorkspaceRef::new("dev")),
        application: Some(ApplicationRef::new("web", "api")),
        ..DestroyOp::default()
    }))?;
    store.put_entity(valid_destroy(DestroyOp {
        id: "2".into(),
        application: Some(ApplicationRef::new("web", "")),
        ..DestroyOp::default()
    }))?;

    let mut scan = store.scan_scopes(EntityKind::DestroyOp)?;
    ensure!(scan.len() == 2, "expected 2 scope entries, got {}", scan.len());
    let first_pass: Vec<_> = scan.by_ref().collect();
    scan.restart();
    let second_pass: Vec<_> = scan.collect();
    ensure!(first_pass == second_pass, "restarted scan differs");

    let dev = &first_pass[0].scope;
    ensure!(
        dev.workspace == "dev" && dev.matches_app(&ApplicationRef::new("web", "api")),
        "scope of destroy 1 is {dev:?}"
    );
    let default = &first_pass[1].scope;
    ensure!(
        default.workspace == "default"
            && default.matches_project("web")
            && default.application.is_none(),
        "scope of destroy 2 is {default:?}"
    );
    ensure!(
        store.scan_scopes(EntityKind::Build)?.is_empty(),
        "destroy records leaked into the build scan"
    );
    Ok(())
}
