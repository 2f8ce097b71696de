//! Report building
//!
//! Turns a finished [`RunSummary`] into a [`RenderModel`]: one block per
//! scope, sorted, with policy-filtered output rows. Nothing here depends on
//! arrival order, so the same summary always yields the same model.

use serde::{Serialize, Serializer};
use std::cmp::Reverse;
use std::time::Duration;

use crate::test_model::{RunSummary, ScopeResult, TestResult, TestStatus};

/// Knobs for building a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Include output lines of failed tests
    pub verbose: bool,
    /// Cosmetic prefix stripped from test names
    pub name_prefix: String,
    /// Output lines starting with one of these are never shown
    pub delimiters: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            name_prefix: "Test".to_string(),
            delimiters: vec!["=== ".to_string(), "--- ".to_string()],
        }
    }
}

impl ReportOptions {
    pub fn display_name<'a>(&self, name: &'a str) -> &'a str {
        if self.name_prefix.is_empty() {
            return name;
        }
        name.strip_prefix(self.name_prefix.as_str()).unwrap_or(name)
    }

    fn is_delimiter(&self, line: &str) -> bool {
        self.delimiters.iter().any(|d| line.starts_with(d.as_str()))
    }
}

/// Everything the renderer needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub groups: Vec<GroupBlock>,
    /// Only present when the run spans more than one scope
    pub overall: Option<OverallBlock>,
    /// Tests that never finished
    pub incomplete: usize,
}

/// One scope's block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBlock {
    pub scope: String,
    pub status: TestStatus,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub running: usize,
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Row {
    Test {
        status: TestStatus,
        name: String,
        #[serde(serialize_with = "as_secs")]
        duration: Duration,
    },
    Output {
        line: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallBlock {
    pub scopes: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub running: usize,
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Build the render model for a finished run
pub fn report(summary: &RunSummary, options: &ReportOptions) -> RenderModel {
    let mut scopes = summary.scopes();
    scopes.sort_by(|a, b| a.name.cmp(&b.name));

    let groups: Vec<GroupBlock> = scopes
        .into_iter()
        .map(|scope| group_block(scope, options))
        .collect();

    let overall = (groups.len() > 1).then(|| OverallBlock {
        scopes: groups.len(),
        total: summary.total,
        passed: summary.passed,
        failed: summary.failed,
        skipped: summary.skipped,
        running: summary.running(),
        duration: groups.iter().map(|g| g.duration).sum(),
    });

    RenderModel {
        groups,
        overall,
        incomplete: summary.running(),
    }
}

fn group_block(mut scope: ScopeResult, options: &ReportOptions) -> GroupBlock {
    sort_tests(&mut scope.tests, options);

    let mut rows = Vec::with_capacity(scope.tests.len());
    for test in &scope.tests {
        rows.push(Row::Test {
            status: test.status,
            name: options.display_name(&test.name).to_string(),
            duration: test.duration,
        });

        if options.verbose && test.status == TestStatus::Failed {
            rows.extend(output_rows(test, options));
        }
    }

    GroupBlock {
        scope: scope.name,
        status: scope.status,
        total: scope.total,
        passed: scope.passed,
        failed: scope.failed,
        skipped: scope.skipped,
        running: scope.running,
        duration: scope.duration,
        rows,
    }
}

/// Failed first, then skipped, passed, running; ties by display name
fn sort_tests(tests: &mut [TestResult], options: &ReportOptions) {
    tests.sort_by(|a, b| {
        Reverse(a.status.priority())
            .cmp(&Reverse(b.status.priority()))
            .then_with(|| options.display_name(&a.name).cmp(options.display_name(&b.name)))
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn output_rows<'a>(test: &'a TestResult, options: &'a ReportOptions) -> impl Iterator<Item = Row> + 'a {
    test.output
        .iter()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !options.is_delimiter(line))
        .map(|line| Row::Output { line: line.clone() })
}
