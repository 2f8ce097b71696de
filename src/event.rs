//! Event decoding
//!
//! Decodes one line of the `go test -json` stream into an [`Event`].
//! The format is only loosely versioned: unknown fields are ignored and
//! unknown actions decode to [`Action::Other`].

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::time::Duration;

/// What happened to a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Test started
    Run,
    /// Test printed a line
    Output,
    /// Test passed
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
    /// Anything else the harness emits (pause, cont, start, bench, ...)
    #[default]
    #[serde(other)]
    Other,
}

impl Action {
    /// Whether this action sets the final status of a test
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Pass | Action::Fail | Action::Skip)
    }
}

/// One record from the structured stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(rename = "Time", default)]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(rename = "Action", default)]
    pub action: Action,
    #[serde(rename = "Package", default)]
    pub scope: String,
    /// Empty for package-level events
    #[serde(rename = "Test", default)]
    pub test: String,
    #[serde(rename = "Output", default)]
    pub output: String,
    /// In seconds
    #[serde(rename = "Elapsed", default)]
    pub elapsed: f64,
}

impl Event {
    /// Decode a single line (without its trailing newline)
    pub fn decode(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// Build an event in code, mostly useful for tests and replays
    pub fn new(action: Action, scope: &str, test: &str) -> Self {
        Self {
            action,
            scope: scope.to_string(),
            test: test.to_string(),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    pub fn with_elapsed(mut self, seconds: f64) -> Self {
        self.elapsed = seconds;
        self
    }

    /// Package-level events carry no test name
    pub fn is_scope_level(&self) -> bool {
        self.test.is_empty()
    }

    /// Elapsed time as a duration; garbage values become zero
    pub fn elapsed(&self) -> Duration {
        Duration::try_from_secs_f64(self.elapsed).unwrap_or(Duration::ZERO)
    }
}
