//! Prism - live `go test -json` reporter
//!
//! A library for running a Go test command and turning its event stream
//! into a readable report:
//! - Concurrent consumption of the structured and diagnostic streams
//! - Aggregation of events into per-test results behind a single lock
//! - Deterministic grouping and sorting of results by package
//! - Terminal rendering with colored status rows

pub mod aggregator;
pub mod config;
pub mod event;
pub mod launcher;
pub mod render;
pub mod report;
pub mod runner;
pub mod stream;
pub mod test_model;

pub use aggregator::{Aggregator, Applied};
pub use config::Config;
pub use event::{Action, Event};
pub use launcher::CommandSpec;
pub use report::{report, RenderModel, ReportOptions};
pub use runner::{check_exit, RunError, Runner};
pub use test_model::{RunSummary, ScopeResult, TestResult, TestStatus};
