//! The registry of conformance cases.
//!
//! Each group covers one area of the store contract. Cases build their own
//! stores through the [`Factory`] they are given and share nothing.

mod concurrency;
mod entity;
mod restart;
mod trigger;
mod workspace;
mod workspace_app;
mod workspace_project;
mod workspace_put;

use crate::factory::{Factory, RestartFactory};

/// Signature of a conformance case.
pub type CaseFn = fn(&dyn Factory, &dyn RestartFactory) -> anyhow::Result<()>;

/// One named check of the store contract.
#[derive(Clone, Copy)]
pub struct Case {
    pub name: &'static str,
    pub run: CaseFn,
    /// Only meaningful for backends with a durable restart.
    pub requires_durability: bool,
}

impl Case {
    pub const fn new(name: &'static str, run: CaseFn) -> Self {
        Self {
            name,
            run,
            requires_durability: false,
        }
    }

    pub const fn durable(name: &'static str, run: CaseFn) -> Self {
        Self {
            name,
            run,
            requires_durability: true,
        }
    }
}

impl std::fmt::Debug for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("requires_durability", &self.requires_durability)
            .finish()
    }
}

/// A named sequence of cases.
#[derive(Clone, Copy, Debug)]
pub struct Group {
    pub name: &'static str,
    pub cases: &'static [Case],
}

/// Every group, in run order.
pub const GROUPS: &[Group] = &[
    Group {
        name: "workspace",
        cases: workspace::CASES,
    },
    Group {
        name: "workspace_put",
        cases: workspace_put::CASES,
    },
    Group {
        name: "workspace_project",
        cases: workspace_project::CASES,
    },
    Group {
        name: "workspace_app",
        cases: workspace_app::CASES,
    },
    Group {
        name: "entity",
        cases: entity::CASES,
    },
    Group {
        name: "trigger",
        cases: trigger::CASES,
    },
    Group {
        name: "concurrency",
        cases: concurrency::CASES,
    },
    Group {
        name: "restart",
        cases: restart::CASES,
    },
];

pub fn find_group(name: &str) -> Option<&'static Group> {
    GROUPS.iter().find(|g| g.name == name)
}

/// Names of the workspaces in `list`, in list order.
fn names(list: &[keel_types::Workspace]) -> Vec<&str> {
    list.iter().map(|w| w.name.as_str()).collect()
}
