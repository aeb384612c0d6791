//! The tagged [`Record`] union and the typed [`Entity`] boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{Build, Deployment, DestroyOp, Release};
use crate::error::TypeError;
use crate::names::{validate_record_id, validate_workspace_name};
use crate::refs::{resolve_workspace, ApplicationRef, WorkspaceRef};
use crate::trigger::Trigger;

/// Kinds of records the entity store keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Build,
    Deployment,
    Release,
    DestroyOp,
    Trigger,
}

impl EntityKind {
    /// Every kind, in scan order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Build,
        EntityKind::Deployment,
        EntityKind::Release,
        EntityKind::DestroyOp,
        EntityKind::Trigger,
    ];

    /// Kinds that record operational facts and feed the workspace index.
    pub const OPERATIONAL: [EntityKind; 4] = [
        EntityKind::Build,
        EntityKind::Deployment,
        EntityKind::Release,
        EntityKind::DestroyOp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Deployment => "deployment",
            Self::Release => "release",
            Self::DestroyOp => "destroy",
            Self::Trigger => "trigger",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved scope of one stored record.
///
/// `workspace` is always concrete (`"default"` when the record names none).
/// `project` and `application` are `None` when absent or empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    pub workspace: String,
    pub project: Option<String>,
    pub application: Option<String>,
}

impl Scope {
    fn resolve(
        workspace: Option<&WorkspaceRef>,
        project: Option<&str>,
        application: Option<&ApplicationRef>,
    ) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            workspace: resolve_workspace(workspace).to_string(),
            project: project
                .and_then(non_empty)
                .or_else(|| application.and_then(|a| non_empty(&a.project))),
            application: application.and_then(|a| non_empty(&a.application)),
        }
    }

    /// Returns `true` if this scope names exactly the given application.
    pub fn matches_app(&self, app: &ApplicationRef) -> bool {
        self.project.as_deref() == Some(app.project.as_str())
            && self.application.as_deref() == Some(app.application.as_str())
    }

    /// Returns `true` if this scope is inside the given project.
    pub fn matches_project(&self, project: &str) -> bool {
        self.project.as_deref() == Some(project)
    }
}

/// Any record the entity store can hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Build(Build),
    Deployment(Deployment),
    Release(Release),
    DestroyOp(DestroyOp),
    Trigger(Trigger),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Build(_) => EntityKind::Build,
            Self::Deployment(_) => EntityKind::Deployment,
            Self::Release(_) => EntityKind::Release,
            Self::DestroyOp(_) => EntityKind::DestroyOp,
            Self::Trigger(_) => EntityKind::Trigger,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Build(b) => &b.id,
            Self::Deployment(d) => &d.id,
            Self::Release(r) => &r.id,
            Self::DestroyOp(d) => &d.id,
            Self::Trigger(t) => &t.id,
        }
    }

    fn refs(&self) -> (Option<&WorkspaceRef>, Option<&ApplicationRef>) {
        match self {
            Self::Build(b) => (b.workspace.as_ref(), b.application.as_ref()),
            Self::Deployment(d) => (d.workspace.as_ref(), d.application.as_ref()),
            Self::Release(r) => (r.workspace.as_ref(), r.application.as_ref()),
            Self::DestroyOp(d) => (d.workspace.as_ref(), d.application.as_ref()),
            Self::Trigger(t) => (t.workspace.as_ref(), t.application.as_ref()),
        }
    }

    pub fn scope(&self) -> Scope {
        let (workspace, application) = self.refs();
        let project = match self {
            Self::Trigger(t) => t.project.as_ref().map(|p| p.project.as_str()),
            _ => None,
        };
        Scope::resolve(workspace, project, application)
    }

    /// Tags carried by the record. Only triggers have tags.
    pub fn tags(&self) -> impl Iterator<Item = &String> {
        let tags = match self {
            Self::Trigger(t) => Some(t.tags.iter()),
            _ => None,
        };
        tags.into_iter().flatten()
    }

    /// Check identity and scope fields before the record is stored.
    pub fn validate(&self) -> Result<(), TypeError> {
        let kind = self.kind().as_str();
        let id = self.id();
        validate_record_id(kind, id)?;

        let (workspace, application) = self.refs();
        if let Some(ws) = workspace.filter(|w| !w.workspace.is_empty()) {
            validate_workspace_name(&ws.workspace).map_err(|e| TypeError::InvalidScope {
                kind,
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        }

        if let Some(app) = application {
            if app.project.is_empty() && !app.application.is_empty() {
                return Err(TypeError::InvalidScope {
                    kind,
                    id: id.to_string(),
                    reason: format!("application {:?} has no project", app.application),
                });
            }
        }

        if let Self::Trigger(t) = self {
            if t.name.is_empty() {
                return Err(TypeError::MissingField {
                    kind,
                    id: id.to_string(),
                    reason: "trigger name is required".into(),
                });
            }
        }

        Ok(())
    }
}

/// A concrete record type that can be stored through the typed store API.
pub trait Entity: Clone + Sized {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn into_record(self) -> Record;

    /// Unwrap a record of this kind; `None` for any other kind.
    fn from_record(record: Record) -> Option<Self>;
}

macro_rules! impl_entity {
    ($ty:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$ty;

            fn id(&self) -> &str {
                &self.id
            }

            fn into_record(self) -> Record {
                Record::$ty(self)
            }

            fn from_record(record: Record) -> Option<Self> {
                match record {
                    Record::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                Record::$ty(value)
            }
        }
    };
}

impl_entity!(Build);
impl_entity!(Deployment);
impl_entity!(Release);
impl_entity!(DestroyOp);
impl_entity!(Trigger);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::ProjectRef;

    #[test]
    fn unscoped_build_lands_in_default_workspace() {
        let record = Record::from(Build {
            id: "1".into(),
            ..Build::default()
        });
        let scope = record.scope();
        assert_eq!(scope.workspace, "default");
        assert_eq!(scope.project, None);
        assert_eq!(scope.application, None);
    }

    #[test]
    fn scoped_build_resolves_every_level() {
        let record = Record::from(Build {
            id: "3".into(),
            workspace: Some(WorkspaceRef::new("1")),
            application: Some(ApplicationRef::new("B", "B")),
            ..Build::default()
        });
        let scope = record.scope();
        assert_eq!(scope.workspace, "1");
        assert!(scope.matches_project("B"));
        assert!(scope.matches_app(&ApplicationRef::new("B", "B")));
        assert!(!scope.matches_app(&ApplicationRef::new("B", "C")));
    }

    #[test]
    fn project_only_scope_has_no_application() {
        let record = Record::from(Release {
            id: "r".into(),
            application: Some(ApplicationRef::new("web", "")),
            ..Release::default()
        });
        let scope = record.scope();
        assert_eq!(scope.project.as_deref(), Some("web"));
        assert_eq!(scope.application, None);
    }

    #[test]
    fn trigger_scope_prefers_project_ref() {
        let record = Record::from(Trigger {
            id: "t".into(),
            name: "nightly".into(),
            project: Some(ProjectRef::new("infra")),
            ..Trigger::default()
        });
        assert_eq!(record.scope().project.as_deref(), Some("infra"));
    }

    #[test]
    fn validate_rejects_empty_id() {
        let record = Record::from(Deployment::default());
        assert!(matches!(
            record.validate(),
            Err(TypeError::InvalidId { kind: "deployment", .. })
        ));
    }

    #[test]
    fn validate_rejects_application_without_project() {
        let record = Record::from(Build {
            id: "1".into(),
            application: Some(ApplicationRef::new("", "api")),
            ..Build::default()
        });
        assert!(matches!(record.validate(), Err(TypeError::InvalidScope { .. })));
    }

    #[test]
    fn validate_rejects_bad_workspace_ref() {
        let record = Record::from(Build {
            id: "1".into(),
            workspace: Some(WorkspaceRef::new("bad name")),
            ..Build::default()
        });
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_nameless_trigger() {
        let record = Record::from(Trigger {
            id: "t".into(),
            ..Trigger::default()
        });
        assert!(matches!(record.validate(), Err(TypeError::MissingField { .. })));
    }

    #[test]
    fn entity_roundtrip_through_record() {
        let build = Build {
            id: "7".into(),
            sequence: 7,
            ..Build::default()
        };
        let record = build.clone().into_record();
        assert_eq!(record.kind(), EntityKind::Build);
        assert_eq!(Build::from_record(record.clone()), Some(build));
        assert_eq!(Deployment::from_record(record), None);
    }

    #[test]
    fn only_triggers_have_tags() {
        let build = Record::from(Build::default());
        assert_eq!(build.tags().count(), 0);

        let trigger = Record::from(Trigger {
            tags: ["a".to_string(), "b".to_string()].into_iter().collect(),
            ..Trigger::default()
        });
        assert_eq!(trigger.tags().count(), 2);
    }
}
