//! Event aggregation
//!
//! Owns the result model while a run is in progress. Every mutation goes
//! through one lock: find-or-create the test, mutate it, then recount.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::{Action, Event};
use crate::test_model::{RunSummary, TestKey, TestResult, TestStatus};

/// What `apply` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Package-level event, not tracked
    Discarded,
    /// First event for this test
    Created,
    /// Existing test updated
    Updated,
}

#[derive(Debug, Default)]
struct State {
    index: HashMap<TestKey, usize>,
    summary: RunSummary,
}

impl State {
    fn apply(&mut self, event: &Event) -> Applied {
        let key = TestKey::new(&event.scope, &event.test);

        let (idx, applied) = match self.index.get(&key) {
            Some(&idx) => (idx, Applied::Updated),
            None => {
                let idx = self.summary.results.len();
                self.summary.results.push(TestResult::new(&key));
                self.index.insert(key, idx);
                self.summary.total += 1;
                (idx, Applied::Created)
            }
        };

        let result = &mut self.summary.results[idx];
        match event.action {
            Action::Output => {
                let line = event.output.trim();
                if !line.is_empty() {
                    result.output.push(line.to_string());
                }
            }
            Action::Pass | Action::Fail | Action::Skip => {
                let previous = result.status;
                result.status = terminal_status(event.action);
                result.duration = event.elapsed();
                let current = result.status;
                self.recount(previous, current);
            }
            Action::Run | Action::Other => {}
        }

        applied
    }

    /// Move one test between counters; a repeated terminal event overwrites
    fn recount(&mut self, previous: TestStatus, current: TestStatus) {
        if let Some(counter) = self.counter(previous) {
            *counter = counter.saturating_sub(1);
        }
        if let Some(counter) = self.counter(current) {
            *counter += 1;
        }
    }

    fn counter(&mut self, status: TestStatus) -> Option<&mut usize> {
        match status {
            TestStatus::Passed => Some(&mut self.summary.passed),
            TestStatus::Failed => Some(&mut self.summary.failed),
            TestStatus::Skipped => Some(&mut self.summary.skipped),
            TestStatus::Running => None,
        }
    }
}

fn terminal_status(action: Action) -> TestStatus {
    match action {
        Action::Pass => TestStatus::Passed,
        Action::Fail => TestStatus::Failed,
        Action::Skip => TestStatus::Skipped,
        Action::Run | Action::Output | Action::Other => TestStatus::Running,
    }
}

/// Shared handle to the result model of one run
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    state: Arc<Mutex<State>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the model
    pub fn apply(&self, event: &Event) -> Applied {
        if event.is_scope_level() {
            return Applied::Discarded;
        }
        self.lock().apply(event)
    }

    /// Copy of the model as it stands right now
    pub fn snapshot(&self) -> RunSummary {
        self.lock().summary.clone()
    }

    /// Take the finished model, copying only if another handle is still alive
    pub fn into_summary(self) -> RunSummary {
        match Arc::try_unwrap(self.state) {
            Ok(mutex) => {
                mutex
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner)
                    .summary
            }
            Err(shared) => {
                let state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                state.summary.clone()
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
