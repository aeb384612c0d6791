//! Operational records: builds, deployments, releases, and destroy operations.
//!
//! The store treats everything except the identity and scope fields as an
//! opaque payload. Records are upserted whole; there is no field merge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refs::{ApplicationRef, WorkspaceRef};

/// Lifecycle state of an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusState {
    #[default]
    Unknown,
    Running,
    Success,
    Error,
}

/// Progress of the operation that produced a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub state: StatusState,
    pub details: String,
    pub start_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
}

impl Status {
    pub fn running(start_time: DateTime<Utc>) -> Self {
        Self {
            state: StatusState::Running,
            start_time: Some(start_time),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, StatusState::Success | StatusState::Error)
    }
}

/// The plugin component that performed an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Component type, e.g. `builder` or `platform`.
    pub kind: String,
    /// Plugin name, e.g. `docker`.
    pub name: String,
}

/// A completed or in-flight build of an application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: String,
    pub workspace: Option<WorkspaceRef>,
    pub application: Option<ApplicationRef>,
    /// Per-application build counter.
    pub sequence: u64,
    pub component: Option<Component>,
    pub labels: BTreeMap<String, String>,
    pub status: Option<Status>,
}

/// A deployment of a built artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub workspace: Option<WorkspaceRef>,
    pub application: Option<ApplicationRef>,
    pub sequence: u64,
    /// Id of the artifact that was deployed.
    pub artifact_id: String,
    pub component: Option<Component>,
    pub labels: BTreeMap<String, String>,
    pub status: Option<Status>,
}

/// A release that routes traffic to a deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub workspace: Option<WorkspaceRef>,
    pub application: Option<ApplicationRef>,
    pub sequence: u64,
    pub deployment_id: String,
    /// Public URL the release is reachable at, if the platform exposes one.
    pub url: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub status: Option<Status>,
}

/// What a destroy operation tears down.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyTarget {
    /// Every resource of the application in the workspace.
    #[default]
    Workspace,
    /// A single deployment, by id.
    Deployment(String),
}

/// A destroy operation. Destroying is itself a new record; prior records
/// are never removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyOp {
    pub id: String,
    pub workspace: Option<WorkspaceRef>,
    pub application: Option<ApplicationRef>,
    pub target: DestroyTarget,
    pub labels: BTreeMap<String, String>,
    pub status: Option<Status>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_build_is_unscoped() {
        let build = Build::default();
        assert!(build.workspace.is_none());
        assert!(build.application.is_none());
        assert!(build.labels.is_empty());
    }

    #[test]
    fn status_completion() {
        let mut status = Status::running(Utc::now());
        assert!(!status.is_complete());
        status.state = StatusState::Success;
        assert!(status.is_complete());
    }

    #[test]
    fn destroy_defaults_to_workspace_target() {
        assert_eq!(DestroyOp::default().target, DestroyTarget::Workspace);
    }

    #[test]
    fn json_roundtrip_preserves_payload() {
        let mut labels = BTreeMap::new();
        labels.insert("commit".to_string(), "abc123".to_string());
        let deployment = Deployment {
            id: "d1".into(),
            application: Some(ApplicationRef::new("web", "api")),
            artifact_id: "a1".into(),
            labels,
            ..Deployment::default()
        };
        let json = serde_json::to_string(&deployment).unwrap();
        let back: Deployment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, deployment);
    }
}
