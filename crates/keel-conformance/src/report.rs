use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a single case ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    /// Not run: the case needs a capability the backend does not offer.
    Skipped,
}

/// Result of one conformance case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseResult {
    pub group: String,
    pub case: String,
    pub status: CaseStatus,
    pub duration_ms: u64,
    /// Failure message, or the reason a case was skipped.
    pub error: Option<String>,
}

impl CaseResult {
    pub fn pass(group: &str, case: &str, duration: Duration) -> Self {
        Self::new(group, case, CaseStatus::Passed, duration, None)
    }

    pub fn fail(group: &str, case: &str, duration: Duration, error: impl Into<String>) -> Self {
        Self::new(group, case, CaseStatus::Failed, duration, Some(error.into()))
    }

    pub fn skip(group: &str, case: &str, reason: impl Into<String>) -> Self {
        Self::new(group, case, CaseStatus::Skipped, Duration::ZERO, Some(reason.into()))
    }

    fn new(
        group: &str,
        case: &str,
        status: CaseStatus,
        duration: Duration,
        error: Option<String>,
    ) -> Self {
        Self {
            group: group.to_string(),
            case: case.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
            error,
        }
    }

    /// `group::case`, as used in reports.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.group, self.case)
    }
}

/// Results of a conformance run against one backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Backend name.
    pub name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<CaseResult>,
}

impl SuiteResults {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: CaseResult) {
        self.total += 1;
        self.duration_ms += result.duration_ms;
        match result.status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Skipped => self.skipped += 1,
        }
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results
            .iter()
            .filter(|r| r.status == CaseStatus::Failed)
    }

    /// Look up the result of `group::case`.
    pub fn result(&self, group: &str, case: &str) -> Option<&CaseResult> {
        self.results
            .iter()
            .find(|r| r.group == group && r.case == case)
    }

    /// Panic with every failure if any case failed.
    pub fn assert_passed(&self) {
        if self.all_passed() {
            return;
        }
        let failures: Vec<String> = self
            .failures()
            .map(|r| {
                format!(
                    "  {}: {}",
                    r.qualified_name(),
                    r.error.as_deref().unwrap_or("failed")
                )
            })
            .collect();
        panic!(
            "{} of {} conformance cases failed for backend {:?}:\n{}",
            self.failed,
            self.total,
            self.name,
            failures.join("\n")
        );
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SuiteResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} passed, {} failed, {} skipped ({} ms)",
            self.name, self.passed, self.failed, self.skipped, self.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SuiteResults {
        let mut suite = SuiteResults::new("memory");
        suite.add_result(CaseResult::pass("entity", "roundtrip", Duration::from_millis(4)));
        suite.add_result(CaseResult::fail(
            "entity",
            "list_order",
            Duration::from_millis(2),
            "ids out of order",
        ));
        suite.add_result(CaseResult::skip("restart", "roundtrip", "not durable"));
        suite
    }

    #[test]
    fn counts_each_status() {
        let suite = sample();
        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert_eq!(suite.skipped, 1);
        assert_eq!(suite.duration_ms, 6);
        assert!(!suite.all_passed());
        assert_eq!(suite.failures().count(), 1);
    }

    #[test]
    fn skipped_cases_do_not_fail_the_suite() {
        let mut suite = SuiteResults::new("memory");
        suite.add_result(CaseResult::skip("restart", "roundtrip", "not durable"));
        assert!(suite.all_passed());
        suite.assert_passed();
    }

    #[test]
    #[should_panic(expected = "entity::list_order: ids out of order")]
    fn assert_passed_lists_failures() {
        sample().assert_passed();
    }

    #[test]
    fn lookup_and_display() {
        let suite = sample();
        assert_eq!(
            suite.result("restart", "roundtrip").map(|r| r.status),
            Some(CaseStatus::Skipped)
        );
        assert!(suite.result("restart", "missing").is_none());
        assert_eq!(
            suite.to_string(),
            "memory: 1 passed, 1 failed, 1 skipped (6 ms)"
        );
    }

    #[test]
    fn serializes_to_json() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"status\": \"skipped\""));
        assert!(json.contains("\"name\": \"memory\""));
    }
}
