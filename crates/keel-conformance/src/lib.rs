//! Conformance suite for Keel state stores.
//!
//! Every backend of the [`StateStore`](keel_store::StateStore) contract is
//! checked against the same cases. A backend is bound to the suite through
//! two capabilities:
//!
//! - [`Factory`]: build a fresh, empty, isolated store
//! - [`RestartFactory`]: close a live store and reopen it on the same
//!   durable medium
//!
//! Cases are grouped by name (see [`GROUPS`]) and run by a [`Harness`],
//! which reports a [`SuiteResults`]. Cases that need durability are
//! skipped for backends whose restart factory is not durable.
//!
//! ```no_run
//! use keel_conformance::{Harness, MemoryBackend, NoRestart};
//!
//! Harness::new("memory", &MemoryBackend, &NoRestart).run().assert_passed();
//! ```

pub mod backends;
pub mod cases;
pub mod factory;
pub mod fixtures;
pub mod harness;
pub mod logging;
pub mod report;

pub use backends::{FileBackend, MemoryBackend};
pub use cases::{find_group, Case, CaseFn, Group, GROUPS};
pub use factory::{Factory, NoRestart, RestartFactory};
pub use harness::Harness;
pub use logging::init_test_logging;
pub use report::{CaseResult, CaseStatus, SuiteResults};
