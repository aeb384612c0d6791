use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{info, warn};

use crate::cases::{find_group, Case, Group, GROUPS};
use crate::factory::{Factory, RestartFactory};
use crate::report::{CaseResult, SuiteResults};

/// Runs registered cases against one backend.
///
/// Each case runs once. A failing case is recorded and the run moves on; a
/// case that panics is recorded as a failure with the panic message.
pub struct Harness<'a> {
    name: String,
    factory: &'a dyn Factory,
    restart: &'a dyn RestartFactory,
}

impl<'a> Harness<'a> {
    pub fn new(
        name: impl Into<String>,
        factory: &'a dyn Factory,
        restart: &'a dyn RestartFactory,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            restart,
        }
    }

    /// Run every group.
    pub fn run(&self) -> SuiteResults {
        let mut results = SuiteResults::new(self.name.clone());
        for group in GROUPS {
            self.run_into(group, &mut results);
        }
        info!(backend = %self.name, %results, "conformance run finished");
        results
    }

    /// Run the group called `name`.
    pub fn run_group(&self, name: &str) -> anyhow::Result<SuiteResults> {
        let group = find_group(name).ok_or_else(|| anyhow::anyhow!("no conformance group {name:?}"))?;
        let mut results = SuiteResults::new(self.name.clone());
        self.run_into(group, &mut results);
        info!(backend = %self.name, group = name, %results, "conformance group finished");
        Ok(results)
    }

    fn run_into(&self, group: &Group, results: &mut SuiteResults) {
        for case in group.cases {
            results.add_result(self.run_case(group.name, case));
        }
    }

    fn run_case(&self, group: &str, case: &Case) -> CaseResult {
        if case.requires_durability && !self.restart.is_durable() {
            return CaseResult::skip(group, case.name, "backend restart is not durable");
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (case.run)(self.factory, self.restart)));
        let elapsed = started.elapsed();

        let error = match outcome {
            Ok(Ok(())) => return CaseResult::pass(group, case.name, elapsed),
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(&*payload),
        };
        warn!(backend = %self.name, group, case = case.name, %error, "conformance case failed");
        CaseResult::fail(group, case.name, elapsed, error)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use crate::factory::NoRestart;
    use crate::report::CaseStatus;
    use keel_store::{StateStore, StoreResult};

    #[test]
    fn memory_backend_passes_every_group() {
        let results = Harness::new("memory", &MemoryBackend, &NoRestart).run();
        results.assert_passed();
        let expected: usize = GROUPS.iter().map(|g| g.cases.len()).sum();
        assert_eq!(results.total, expected);
    }

    #[test]
    fn restart_cases_skipped_without_durability() {
        let results = Harness::new("memory", &MemoryBackend, &NoRestart)
            .run_group("restart")
            .unwrap();
        assert_eq!(results.skipped, results.total);
        assert!(results.total > 0);
        assert!(results
            .results
            .iter()
            .all(|r| r.status == CaseStatus::Skipped));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let harness = Harness::new("memory", &MemoryBackend, &NoRestart);
        assert!(harness.run_group("nope").is_err());
    }

    #[test]
    fn broken_backend_fails_and_reports() {
        let broken = || -> StoreResult<Box<dyn StateStore>> {
            Err(keel_store::StoreError::invalid("cannot create store"))
        };
        let results = Harness::new("broken", &broken, &NoRestart)
            .run_group("entity")
            .unwrap();
        assert_eq!(results.failed, results.total);
        let first = results.failures().next().unwrap();
        assert!(first.error.as_deref().unwrap().contains("cannot create store"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(&"boom"), "panicked: boom");
        assert_eq!(panic_message(&String::from("bang")), "panicked: bang");
        assert_eq!(panic_message(&42u8), "panicked");
    }
}
