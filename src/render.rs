//! Terminal rendering of a [`RenderModel`]

use colored::{ColoredString, Colorize};
use std::fmt::Write;
use std::time::Duration;

use crate::report::{GroupBlock, OverallBlock, RenderModel, Row};
use crate::test_model::TestStatus;

const LINE_WIDTH: usize = 80;
const ICON_WIDTH: usize = 2;
const STATUS_WIDTH: usize = 5;
const DURATION_WIDTH: usize = 10;
const MIN_NAME_WIDTH: usize = 10;
const OUTPUT_INDENT: usize = ICON_WIDTH + 1 + STATUS_WIDTH + 1;

pub fn status_icon(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "✓",
        TestStatus::Failed => "✗",
        TestStatus::Skipped => "⊝",
        TestStatus::Running => "◌",
    }
}

pub fn status_label(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "PASS",
        TestStatus::Failed => "FAIL",
        TestStatus::Skipped => "SKIP",
        TestStatus::Running => "RUN",
    }
}

fn paint(text: &str, status: TestStatus) -> ColoredString {
    match status {
        TestStatus::Passed => text.green().bold(),
        TestStatus::Failed => text.red().bold(),
        TestStatus::Skipped => text.yellow().bold(),
        TestStatus::Running => text.bright_black(),
    }
}

/// Short human duration: "0s", "850µs", "12.3ms", "1.25s", "2m03s"
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if duration.is_zero() {
        "0s".to_string()
    } else if duration < Duration::from_millis(1) {
        format!("{}µs", duration.as_micros())
    } else if duration < Duration::from_secs(1) {
        format!("{:.1}ms", secs * 1000.0)
    } else if duration < Duration::from_secs(60) {
        format!("{:.2}s", secs)
    } else {
        let whole = duration.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}

/// Render the whole report as display text
pub fn render(model: &RenderModel) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Test Results".magenta().bold().underline());
    let _ = writeln!(out);

    if model.groups.is_empty() {
        let _ = writeln!(out, "  {}", "No tests were run".dimmed());
    }

    for group in &model.groups {
        render_group(&mut out, group);
    }

    if let Some(ref overall) = model.overall {
        render_overall(&mut out, overall);
    }

    if model.incomplete > 0 {
        let _ = writeln!(
            out,
            "{} {} test(s) never reported a result; the run did not finish",
            "!".yellow().bold(),
            model.incomplete
        );
    }

    out
}

fn render_group(out: &mut String, group: &GroupBlock) {
    let mut counts = format!(
        "({} total, {} passed, {} failed, {} skipped",
        group.total, group.passed, group.failed, group.skipped
    );
    if group.running > 0 {
        let _ = write!(counts, ", {} running", group.running);
    }
    counts.push(')');

    let status = header_status(group);
    let _ = writeln!(
        out,
        "{} {} {} {} {}",
        paint(status_icon(status), status),
        paint(status_label(status), status),
        group.scope.cyan().bold(),
        format!("({})", format_duration(group.duration)).bright_black(),
        counts.dimmed()
    );
    let _ = writeln!(out, "{}", "─".repeat(LINE_WIDTH).bright_black());

    let name_width = name_column_width(group);
    let _ = writeln!(
        out,
        "{:icon_w$} {:status_w$} {:name_w$} {:>duration_w$}",
        "",
        "RES".bright_black().bold(),
        "TEST NAME".bright_black().bold(),
        "DURATION".bright_black().bold(),
        icon_w = ICON_WIDTH,
        status_w = STATUS_WIDTH,
        name_w = name_width,
        duration_w = DURATION_WIDTH,
    );

    for row in &group.rows {
        match row {
            Row::Test {
                status,
                name,
                duration,
            } => {
                let _ = writeln!(
                    out,
                    "{:icon_w$} {:status_w$} {:name_w$} {:>duration_w$}",
                    paint(status_icon(*status), *status),
                    paint(status_label(*status), *status),
                    name,
                    format_duration(*duration).bright_black(),
                    icon_w = ICON_WIDTH,
                    status_w = STATUS_WIDTH,
                    name_w = name_width,
                    duration_w = DURATION_WIDTH,
                );
            }
            Row::Output { line } => {
                let _ = writeln!(
                    out,
                    "{:indent$}{}",
                    "",
                    line.italic().bright_black(),
                    indent = OUTPUT_INDENT
                );
            }
        }
    }

    let _ = writeln!(out);
}

/// A scope with unfinished tests never shows a pass or skip mark
fn header_status(group: &GroupBlock) -> TestStatus {
    if group.running > 0 && group.status != TestStatus::Failed {
        TestStatus::Running
    } else {
        group.status
    }
}

fn name_column_width(group: &GroupBlock) -> usize {
    let widest = group
        .rows
        .iter()
        .filter_map(|row| match row {
            Row::Test { name, .. } => Some(name.chars().count()),
            Row::Output { .. } => None,
        })
        .max()
        .unwrap_or(0);

    let room = LINE_WIDTH - (ICON_WIDTH + STATUS_WIDTH + DURATION_WIDTH + 3);
    widest.clamp(MIN_NAME_WIDTH, room)
}

fn render_overall(out: &mut String, overall: &OverallBlock) {
    let _ = writeln!(out, "{}", "Overall Test Results".bold());
    let mut line = format!(
        "Total: {} | {} {} | {} {} | {} {}",
        overall.total,
        "Passed:".green().bold(),
        overall.passed,
        "Skipped:".yellow().bold(),
        overall.skipped,
        "Failed:".red().bold(),
        overall.failed
    );
    if overall.running > 0 {
        let _ = write!(line, " | {} {}", "Running:".bright_black(), overall.running);
    }
    let _ = writeln!(out, "{}", line);
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{} package(s) in {}",
            overall.scopes,
            format_duration(overall.duration)
        )
        .dimmed()
    );
    let _ = writeln!(out);
}
