//! Valid records for conformance cases.
//!
//! Each fixture takes a partially filled record and fills what the caller
//! left unset: a fresh UUID v7 id, the `a_test` / `a_test` application and
//! a running status. The workspace is never filled, so an unscoped record
//! stays in the default workspace.

use chrono::{DateTime, Utc};
use keel_types::{
    ApplicationRef, Build, Deployment, DestroyOp, Release, Status, Trigger, TriggerOperation,
};
use uuid::Uuid;

/// Project and application names given to records that name none.
pub const TEST_PROJECT: &str = "a_test";
pub const TEST_APPLICATION: &str = "a_test";

pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// A fixed UTC timestamp, `secs` seconds after the Unix epoch.
pub fn at(secs: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| anyhow::anyhow!("timestamp {secs} out of range"))
}

pub fn test_application() -> ApplicationRef {
    ApplicationRef::new(TEST_PROJECT, TEST_APPLICATION)
}

fn fill_common(
    id: &mut String,
    application: &mut Option<ApplicationRef>,
    status: &mut Option<Status>,
) {
    if id.is_empty() {
        *id = new_id();
    }
    if application.is_none() {
        *application = Some(test_application());
    }
    if status.is_none() {
        *status = Some(Status::running(Utc::now()));
    }
}

pub fn valid_build(mut build: Build) -> Build {
    fill_common(&mut build.id, &mut build.application, &mut build.status);
    if build.sequence == 0 {
        build.sequence = 1;
    }
    build
}

pub fn valid_deployment(mut deployment: Deployment) -> Deployment {
    fill_common(
        &mut deployment.id,
        &mut deployment.application,
        &mut deployment.status,
    );
    if deployment.artifact_id.is_empty() {
        deployment.artifact_id = new_id();
    }
    deployment
}

pub fn valid_release(mut release: Release) -> Release {
    fill_common(&mut release.id, &mut release.application, &mut release.status);
    if release.deployment_id.is_empty() {
        release.deployment_id = new_id();
    }
    release
}

pub fn valid_destroy(mut destroy: DestroyOp) -> DestroyOp {
    fill_common(&mut destroy.id, &mut destroy.application, &mut destroy.status);
    destroy
}

pub fn valid_trigger(mut trigger: Trigger) -> Trigger {
    if trigger.id.is_empty() {
        trigger.id = new_id();
    }
    if trigger.name.is_empty() {
        trigger.name = format!("trigger-{}", &trigger.id[..8.min(trigger.id.len())]);
    }
    if trigger.application.is_none() {
        trigger.application = Some(test_application());
    }
    if trigger.description.is_empty() {
        trigger.description = format!("{} trigger", trigger.operation.label());
    }
    trigger
}

/// A trigger for `operation` carrying `tags`.
pub fn tagged_trigger(operation: TriggerOperation, tags: &[&str]) -> Trigger {
    valid_trigger(Trigger {
        operation,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Trigger::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_types::{Record, WorkspaceRef};

    #[test]
    fn fills_unset_fields() {
        let build = valid_build(Build::default());
        assert!(!build.id.is_empty());
        assert_eq!(build.application, Some(test_application()));
        assert!(build.status.is_some());
        assert!(Record::from(build).validate().is_ok());
    }

    #[test]
    fn keeps_caller_fields() {
        let build = valid_build(Build {
            id: "3".into(),
            workspace: Some(WorkspaceRef::new("1")),
            application: Some(ApplicationRef::new("B", "B")),
            ..Build::default()
        });
        assert_eq!(build.id, "3");
        assert_eq!(build.application, Some(ApplicationRef::new("B", "B")));
        assert_eq!(build.workspace, Some(WorkspaceRef::new("1")));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn every_fixture_validates() {
        let records = [
            Record::from(valid_deployment(Deployment::default())),
            Record::from(valid_release(Release::default())),
            Record::from(valid_destroy(DestroyOp::default())),
            Record::from(tagged_trigger(TriggerOperation::Up, &["a"])),
        ];
        for record in records {
            assert!(record.validate().is_ok(), "{:?} should be valid", record.kind());
        }
    }
}
