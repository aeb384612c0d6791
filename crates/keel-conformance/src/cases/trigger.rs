//! Trigger storage and tag-subset filtering.

use anyhow::{bail, ensure};
use keel_store::{EntityStoreExt, ListFilter, ListTriggerRequest};
use keel_types::{
    ApplicationRef, DestroyTarget, ProjectRef, Trigger, TriggerOperation, WorkspaceRef,
};

use super::Case;
use crate::factory::{Factory, RestartFactory};
use crate::fixtures::{at, tagged_trigger, valid_trigger};

pub(super) const CASES: &[Case] = &[
    Case::new("roundtrip", roundtrip),
    Case::new("requires_name", requires_name),
    Case::new("tag_subset", tag_subset),
    Case::new("list_by_scope", list_by_scope),
];

fn ids(triggers: &[Trigger]) -> Vec<&str> {
    triggers.iter().map(|t| t.id.as_str()).collect()
}

fn roundtrip(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let trigger = valid_trigger(Trigger {
        id: "t1".into(),
        name: "teardown".into(),
        workspace: Some(WorkspaceRef::new("staging")),
        operation: TriggerOperation::Destroy(DestroyTarget::Workspace),
        tags: ["nightly", "cleanup"].into_iter().map(String::from).collect(),
        authenticated: true,
        active_time: Some(at(1_700_000_000)?),
        ..Trigger::default()
    });
    store.put_entity(trigger.clone())?;

    let read_back: Trigger = store.get_entity("t1")?;
    ensure!(read_back == trigger, "trigger changed in storage: {read_back:?}");
    ensure!(
        read_back.operation.label() == "destroy workspace operation",
        "operation label {:?}",
        read_back.operation.label()
    );
    Ok(())
}

fn requires_name(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let mut trigger = valid_trigger(Trigger::default());
    trigger.name.clear();
    match store.put_entity(trigger) {
        Err(err) if err.is_invalid() => {}
        Err(err) => bail!("expected Invalid, got {err}"),
        Ok(()) => bail!("trigger without a name accepted"),
    }
    let all: Vec<Trigger> = store.list_entities(&ListFilter::all())?;
    ensure!(all.is_empty(), "rejected trigger stored: {:?}", ids(&all));
    Ok(())
}

fn tag_subset(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    let mut both = tagged_trigger(TriggerOperation::Deploy, &["prod", "web"]);
    both.id = "both".into();
    let mut prod = tagged_trigger(TriggerOperation::Build, &["prod"]);
    prod.id = "prod".into();
    let mut none = tagged_trigger(TriggerOperation::Up, &[]);
    none.id = "none".into();
    for trigger in [both, prod, none] {
        store.put_entity(trigger)?;
    }

    let cases: [(&[&str], &[&str]); 5] = [
        (&[], &["both", "none", "prod"]),
        (&["prod"], &["both", "prod"]),
        (&["prod", "web"], &["both"]),
        (&["web", "prod"], &["both"]),
        (&["prod", "db"], &[]),
    ];
    for (tags, expected) in cases {
        let request = ListTriggerRequest {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..ListTriggerRequest::default()
        };
        let found: Vec<Trigger> = store.list_entities(&ListFilter::from(request))?;
        ensure!(
            ids(&found) == expected,
            "tags {tags:?} listed {:?}, expected {expected:?}",
            ids(&found)
        );
    }
    Ok(())
}

fn list_by_scope(factory: &dyn Factory, _: &dyn RestartFactory) -> anyhow::Result<()> {
    let store = factory.create()?;
    store.put_entity(valid_trigger(Trigger {
        id: "a".into(),
        workspace: Some(WorkspaceRef::new("dev")),
        project: Some(ProjectRef::new("infra")),
        ..Trigger::default()
    }))?;
    store.put_entity(valid_trigger(Trigger {
        id: "b".into(),
        workspace: Some(WorkspaceRef::new("dev")),
        application: Some(ApplicationRef::new("web", "api")),
        ..Trigger::default()
    }))?;
    store.put_entity(valid_trigger(Trigger {
        id: "c".into(),
        application: Some(ApplicationRef::new("web", "api")),
        ..Trigger::default()
    }))?;

    let cases = [
        (
            ListTriggerRequest {
                workspace: Some(WorkspaceRef::new("dev")),
                ..ListTriggerRequest::default()
            },
            vec!["a", "b"],
        ),
        (
            ListTriggerRequest {
                project: Some(ProjectRef::new("infra")),
                ..ListTriggerRequest::default()
            },
            vec!["a"],
        ),
        (
            ListTriggerRequest {
                application: Some(ApplicationRef::new("web", "api")),
                ..ListTriggerRequest::default()
            },
            vec!["b", "c"],
        ),
        (
            ListTriggerRequest {
                workspace: Some(WorkspaceRef::new("default")),
                application: Some(ApplicationRef::new("web", "api")),
                ..ListTriggerRequest::default()
            },
            vec!["c"],
        ),
    ];
    for (request, expected) in cases {
        let label = format!("{request:?}");
        let found: Vec<Trigger> = store.list_entities(&ListFilter::from(request))?;
        ensure!(
            ids(&found) == expected,
            "{label} listed {:?}, expected {expected:?}",
            ids(&found)
        );
    }
    Ok(())
}
