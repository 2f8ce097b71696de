//! Test model definitions
//!
//! Core data structures for a single run: per-test results, the run-level
//! summary the aggregator fills in, and the per-scope projection the
//! reporter groups by.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Status of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Seen but no terminal event yet
    #[default]
    Running,
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Sort weight, highest first in a report
    pub fn priority(&self) -> u8 {
        match self {
            TestStatus::Failed => 3,
            TestStatus::Skipped => 2,
            TestStatus::Passed => 1,
            TestStatus::Running => 0,
        }
    }
}

/// Identity of a test within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestKey {
    pub scope: String,
    pub name: String,
}

impl TestKey {
    pub fn new(scope: &str, name: &str) -> Self {
        Self {
            scope: scope.to_string(),
            name: name.to_string(),
        }
    }
}

/// Aggregated result of a single test
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    /// Full test name, e.g. "TestParse/empty_input"
    pub name: String,
    /// Package the test belongs to
    pub scope: String,
    pub status: TestStatus,
    pub duration: Duration,
    /// Non-blank output lines in arrival order
    pub output: Vec<String>,
}

impl TestResult {
    pub fn new(key: &TestKey) -> Self {
        Self {
            name: key.name.clone(),
            scope: key.scope.clone(),
            status: TestStatus::Running,
            duration: Duration::ZERO,
            output: Vec::new(),
        }
    }
}

/// Overall results of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// One entry per distinct (scope, name), in first-seen order
    pub results: Vec<TestResult>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Tests that never received a terminal event
    pub fn running(&self) -> usize {
        self.total
            .saturating_sub(self.passed + self.failed + self.skipped)
    }

    pub fn is_complete(&self) -> bool {
        self.running() == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Every test finished and none failed
    pub fn succeeded(&self) -> bool {
        !self.has_failures() && self.is_complete()
    }

    pub fn find(&self, scope: &str, name: &str) -> Option<&TestResult> {
        self.results
            .iter()
            .find(|r| r.scope == scope && r.name == name)
    }

    /// Group the flat result list by scope
    pub fn scopes(&self) -> Vec<ScopeResult> {
        ScopeResult::fold(&self.results)
    }
}

/// Aggregated results for a single scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeResult {
    pub name: String,
    pub tests: Vec<TestResult>,
    pub status: TestStatus,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Tests still running when the run ended
    pub running: usize,
    /// Sum of member durations
    pub duration: Duration,
}

impl ScopeResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
            status: TestStatus::Passed,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            running: 0,
            duration: Duration::ZERO,
        }
    }

    fn push(&mut self, test: TestResult) {
        self.total += 1;
        self.duration += test.duration;

        match test.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Running => self.running += 1,
        }

        self.tests.push(test);
        self.status = self.derive_status();
    }

    fn derive_status(&self) -> TestStatus {
        if self.failed > 0 {
            TestStatus::Failed
        } else if self.skipped == self.total {
            TestStatus::Skipped
        } else {
            TestStatus::Passed
        }
    }

    pub fn is_complete(&self) -> bool {
        self.running == 0
    }

    /// Group results by scope, scopes in first-seen order, tests in input order
    pub fn fold(results: &[TestResult]) -> Vec<ScopeResult> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut scopes: Vec<ScopeResult> = Vec::new();

        for result in results {
            let idx = *index.entry(result.scope.as_str()).or_insert_with(|| {
                scopes.push(ScopeResult::new(&result.scope));
                scopes.len() - 1
            });
            scopes[idx].push(result.clone());
        }

        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(scope: &str, name: &str, status: TestStatus, millis: u64) -> TestResult {
        let mut r = TestResult::new(&TestKey::new(scope, name));
        r.status = status;
        r.duration = Duration::from_millis(millis);
        r
    }

    #[test]
    fn test_fold_keeps_first_seen_order() {
        let results = vec![
            result("pkg/b", "TestOne", TestStatus::Passed, 1),
            result("pkg/a", "TestTwo", TestStatus::Passed, 2),
            result("pkg/b", "TestThree", TestStatus::Passed, 3),
        ];

        let scopes = ScopeResult::fold(&results);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].name, "pkg/b");
        assert_eq!(scopes[0].total, 2);
        assert_eq!(scopes[0].duration, Duration::from_millis(4));
        assert_eq!(scopes[1].name, "pkg/a");
    }

    #[test]
    fn test_failed_dominates_scope_status() {
        let mut results = Vec::new();
        for name in ["TestA", "TestB", "TestC"] {
            results.push(result("pkg", name, TestStatus::Passed, 1));
        }
        results.push(result("pkg", "TestD", TestStatus::Skipped, 0));
        results.push(result("pkg", "TestE", TestStatus::Failed, 5));

        let scopes = ScopeResult::fold(&results);
        assert_eq!(scopes[0].status, TestStatus::Failed);
        assert_eq!(scopes[0].total, 5);
        assert_eq!((scopes[0].passed, scopes[0].skipped, scopes[0].failed), (3, 1, 1));
    }

    #[test]
    fn test_all_skipped_scope_is_skipped() {
        let results = vec![
            result("pkg", "TestA", TestStatus::Skipped, 0),
            result("pkg", "TestB", TestStatus::Skipped, 0),
        ];
        assert_eq!(ScopeResult::fold(&results)[0].status, TestStatus::Skipped);
    }

    #[test]
    fn test_running_tests_are_counted_separately() {
        let results = vec![
            result("pkg", "TestA", TestStatus::Passed, 1),
            result("pkg", "TestB", TestStatus::Running, 0),
        ];
        let scope = &ScopeResult::fold(&results)[0];
        assert_eq!(scope.total, 2);
        assert_eq!(scope.running, 1);
        assert!(!scope.is_complete());
        assert_eq!(scope.status, TestStatus::Passed);
    }

    #[test]
    fn test_summary_running_count() {
        let summary = RunSummary {
            results: Vec::new(),
            total: 4,
            passed: 2,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(summary.running(), 1);
        assert!(!summary.is_complete());
        assert!(summary.has_failures());
        assert!(!summary.succeeded());

        let clean = RunSummary {
            results: Vec::new(),
            total: 3,
            passed: 2,
            failed: 0,
            skipped: 1,
        };
        assert!(clean.succeeded());
    }

    #[test]
    fn test_status_priority_order() {
        let mut statuses = vec![
            TestStatus::Passed,
            TestStatus::Running,
            TestStatus::Failed,
            TestStatus::Skipped,
        ];
        statuses.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        assert_eq!(
            statuses,
            vec![
                TestStatus::Failed,
                TestStatus::Skipped,
                TestStatus::Passed,
                TestStatus::Running
            ]
        );
    }
}
