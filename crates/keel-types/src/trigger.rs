//! Trigger definitions.
//!
//! A trigger names an operation to run against a scope when it fires. The
//! state layer only stores triggers and filters them; firing them is the job
//! of the execution pipeline.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::DestroyTarget;
use crate::refs::{ApplicationRef, ProjectRef, WorkspaceRef};

/// The operation a trigger runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOperation {
    #[default]
    Build,
    Push,
    Deploy,
    Destroy(DestroyTarget),
    Release,
    Up,
    Init,
}

impl TriggerOperation {
    /// Human-readable label, as shown in trigger listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Build => "build operation",
            Self::Push => "push operation",
            Self::Deploy => "deploy operation",
            Self::Destroy(DestroyTarget::Workspace) => "destroy workspace operation",
            Self::Destroy(DestroyTarget::Deployment(_)) => "destroy deployment operation",
            Self::Release => "release operation",
            Self::Up => "up operation",
            Self::Init => "init operation",
        }
    }
}

impl fmt::Display for TriggerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored trigger definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    pub workspace: Option<WorkspaceRef>,
    pub project: Option<ProjectRef>,
    pub application: Option<ApplicationRef>,
    pub tags: BTreeSet<String>,
    pub operation: TriggerOperation,
    pub description: String,
    /// Whether firing the trigger requires an authenticated request.
    pub authenticated: bool,
    /// When the trigger last fired.
    pub active_time: Option<DateTime<Utc>>,
}

impl Trigger {
    /// Returns `true` if the trigger carries every one of `tags`.
    ///
    /// An empty `tags` matches every trigger; a trigger with no tags never
    /// matches a non-empty `tags`.
    pub fn has_all_tags<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        tags.into_iter().all(|tag| self.tags.contains(tag))
    }

    /// The project this trigger is scoped to, from either its project or its
    /// application reference.
    pub fn project_name(&self) -> Option<&str> {
        self.project
            .as_ref()
            .map(|p| p.project.as_str())
            .filter(|p| !p.is_empty())
            .or_else(|| {
                self.application
                    .as_ref()
                    .map(|a| a.project.as_str())
                    .filter(|p| !p.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tags: &[&str]) -> Trigger {
        Trigger {
            id: "t".into(),
            name: "t".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Trigger::default()
        }
    }

    #[test]
    fn tag_match_requires_every_tag() {
        let trigger = tagged(&["prod", "web"]);
        let wanted: Vec<String> = vec!["prod".into(), "web".into()];
        assert!(trigger.has_all_tags(&wanted));

        let wanted: Vec<String> = vec!["prod".into(), "db".into()];
        assert!(!trigger.has_all_tags(&wanted));
    }

    #[test]
    fn untagged_trigger_never_matches_tags() {
        let trigger = tagged(&[]);
        let wanted: Vec<String> = vec!["prod".into()];
        assert!(!trigger.has_all_tags(&wanted));
        assert!(trigger.has_all_tags(&Vec::<String>::new()));
    }

    #[test]
    fn operation_labels() {
        assert_eq!(TriggerOperation::Up.to_string(), "up operation");
        assert_eq!(
            TriggerOperation::Destroy(DestroyTarget::Deployment("d1".into())).label(),
            "destroy deployment operation"
        );
        assert_eq!(
            TriggerOperation::Destroy(DestroyTarget::Workspace).label(),
            "destroy workspace operation"
        );
    }

    #[test]
    fn project_falls_back_to_application() {
        let mut trigger = tagged(&[]);
        assert_eq!(trigger.project_name(), None);

        trigger.application = Some(ApplicationRef::new("web", "api"));
        assert_eq!(trigger.project_name(), Some("web"));

        trigger.project = Some(ProjectRef::new("infra"));
        assert_eq!(trigger.project_name(), Some("infra"));
    }
}
