//! The full conformance suite against the in-memory backend.

use keel_conformance::{init_test_logging, CaseStatus, Harness, MemoryBackend, NoRestart, GROUPS};

#[test]
fn memory_backend_conforms() {
    init_test_logging();
    let results = Harness::new("memory", &MemoryBackend, &NoRestart).run();
    results.assert_passed();

    let restart_cases = GROUPS
        .iter()
        .filter(|g| g.name == "restart")
        .map(|g| g.cases.len())
        .sum::<usize>();
    assert_eq!(results.skipped, restart_cases);
    assert!(results
        .results
        .iter()
        .filter(|r| r.group != "restart")
        .all(|r| r.status == CaseStatus::Passed));
}

#[test]
fn each_group_runs_alone() {
    init_test_logging();
    let harness = Harness::new("memory", &MemoryBackend, &NoRestart);
    for group in GROUPS {
        let results = harness.run_group(group.name).unwrap();
        results.assert_passed();
        assert_eq!(results.total, group.cases.len(), "{}", group.name);
    }
}
