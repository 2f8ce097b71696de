//! Run orchestration
//!
//! Starts the test command, drains both of its output streams concurrently
//! and hands back the finished summary once the command has exited and both
//! streams are fully consumed.

use futures::future::join;
use std::io;
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::task::JoinError;

use crate::aggregator::Aggregator;
use crate::launcher::CommandSpec;
use crate::stream::{consume_passthrough, consume_structured, StreamRole};
use crate::test_model::RunSummary;

/// Exit code `go test` uses for "ran fine, some tests failed"
pub const TESTS_FAILED_EXIT_CODE: i32 = 1;

/// Where warnings and passthrough text go
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Failures that make a run's summary unusable
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to capture {stream} of the test command")]
    MissingPipe { stream: &'static str },

    #[error("failed waiting for the test command: {0}")]
    Wait(#[source] io::Error),

    #[error("error reading {stream}: {source}")]
    Stream {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{stream} consumer stopped unexpectedly: {source}")]
    Join {
        stream: &'static str,
        #[source]
        source: JoinError,
    },

    #[error("command exited with non-zero status {0}")]
    ExitCode(i32),

    #[error("command was terminated by a signal")]
    Terminated,
}

/// Map the command's exit code onto the run outcome.
///
/// `0` and the "tests failed" code are normal; anything else is an
/// execution error.
pub fn check_exit(code: Option<i32>) -> Result<(), RunError> {
    match code {
        Some(0) | Some(TESTS_FAILED_EXIT_CODE) => Ok(()),
        Some(code) => Err(RunError::ExitCode(code)),
        None => Err(RunError::Terminated),
    }
}

/// Runs one test command and aggregates its event stream
pub struct Runner {
    spec: CommandSpec,
    warnings: Sink,
    passthrough: Sink,
}

impl Runner {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            warnings: Box::new(tokio::io::stderr()),
            passthrough: Box::new(tokio::io::stderr()),
        }
    }

    /// Send decode warnings somewhere other than stderr
    pub fn with_warnings(mut self, sink: Sink) -> Self {
        self.warnings = sink;
        self
    }

    /// Send the command's own stderr somewhere other than ours
    pub fn with_passthrough(mut self, sink: Sink) -> Self {
        self.passthrough = sink;
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Run the command to completion.
    ///
    /// The summary is only returned when the command exited normally and
    /// both streams were drained; a partial model is never surfaced.
    pub async fn run(self) -> Result<RunSummary, RunError> {
        let Runner {
            spec,
            warnings,
            passthrough,
        } = self;

        let (stdout, stderr, exit) = spec.spawn()?.into_parts();
        let aggregator = Aggregator::new();

        // Both consumers start right away so neither pipe can fill up and
        // stall the child.
        let structured = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { consume_structured(stdout, &aggregator, warnings).await })
        };
        let diagnostics = tokio::spawn(consume_passthrough(stderr, passthrough));

        let code = exit.wait().await;
        let (structured, diagnostics) = join(structured, diagnostics).await;

        let stats = settle(StreamRole::Structured, structured)?;
        settle(StreamRole::Passthrough, diagnostics)?;
        check_exit(code?)?;

        let summary = aggregator.into_summary();
        tracing::debug!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            malformed = stats.malformed,
            "run finished"
        );
        Ok(summary)
    }
}

fn settle<T>(
    role: StreamRole,
    joined: Result<io::Result<T>, JoinError>,
) -> Result<T, RunError> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RunError::Stream {
            stream: role.name(),
            source,
        }),
        Err(source) => Err(RunError::Join {
            stream: role.name(),
            source,
        }),
    }
}
