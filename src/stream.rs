//! Stream consumers
//!
//! One consumer reads one output stream of the test command, line by line,
//! until end of stream. The structured role decodes events and feeds the
//! aggregator; the passthrough role forwards lines untouched.

use colored::{ColoredString, Colorize};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::aggregator::{Aggregator, Applied};
use crate::event::Event;

/// Role of a stream in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// `go test -json` events on stdout
    Structured,
    /// Free-form diagnostics on stderr
    Passthrough,
}

impl StreamRole {
    pub fn name(&self) -> &'static str {
        match self {
            StreamRole::Structured => "stdout",
            StreamRole::Passthrough => "stderr",
        }
    }
}

/// Counters for one consumed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub lines: usize,
    /// Events that reached a test result
    pub applied: usize,
    /// Package-level events
    pub discarded: usize,
    /// Lines that did not decode
    pub malformed: usize,
}

/// Line reader over raw bytes; invalid UTF-8 is not an error at this level
struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Next line exactly as read, terminator included, `None` at end of stream
    async fn next_raw(&mut self) -> io::Result<Option<&[u8]>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.as_slice()))
    }

    /// Next line without its terminator, `None` at end of stream
    async fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        if self.next_raw().await?.is_none() {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(self.buf.as_slice()))
    }
}

fn warning_prefix() -> ColoredString {
    "Warning:".yellow().bold()
}

/// Decode every line of `reader` into the aggregator.
///
/// A line that does not decode produces one warning on `warnings` and is
/// skipped; it never stops the rest of the stream from being applied.
pub async fn consume_structured<R, W>(
    reader: R,
    aggregator: &Aggregator,
    mut warnings: W,
) -> io::Result<ConsumeStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = LineReader::new(reader);
    let mut stats = ConsumeStats::default();

    while let Some(line) = lines.next_line().await? {
        stats.lines += 1;

        match Event::decode(line) {
            Ok(event) => match aggregator.apply(&event) {
                Applied::Discarded => stats.discarded += 1,
                Applied::Created | Applied::Updated => stats.applied += 1,
            },
            Err(e) => {
                stats.malformed += 1;
                let message = format!(
                    "{} Failed to decode test event: {} (line: {})\n",
                    warning_prefix(),
                    e,
                    String::from_utf8_lossy(line)
                );
                warnings.write_all(message.as_bytes()).await?;
            }
        }
    }

    warnings.flush().await?;
    tracing::debug!(
        lines = stats.lines,
        applied = stats.applied,
        discarded = stats.discarded,
        malformed = stats.malformed,
        "structured stream drained"
    );
    Ok(stats)
}

/// Forward every line of `reader` to `out` verbatim.
///
/// Each line goes out in a single write, with its terminator if it had one.
pub async fn consume_passthrough<R, W>(reader: R, mut out: W) -> io::Result<ConsumeStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = LineReader::new(reader);
    let mut stats = ConsumeStats::default();

    while let Some(line) = lines.next_raw().await? {
        stats.lines += 1;
        out.write_all(line).await?;
    }

    out.flush().await?;
    tracing::debug!(lines = stats.lines, "passthrough stream drained");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_model::TestStatus;

    const PASS_A: &str = r#"{"Action":"pass","Package":"pkg","Test":"TestA","Elapsed":0.5}"#;
    const PASS_B: &str = r#"{"Action":"pass","Package":"pkg","Test":"TestB","Elapsed":0.25}"#;

    #[tokio::test]
    async fn test_malformed_line_between_valid_lines() {
        let input = format!("{}\nnot json at all\n{}\n", PASS_A, PASS_B);
        let agg = Aggregator::new();
        let mut warnings = Vec::new();

        let stats = consume_structured(input.as_bytes(), &agg, &mut warnings)
            .await
            .unwrap();

        assert_eq!(stats.lines, 3);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.malformed, 1);

        let text = String::from_utf8(warnings).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("Warning:"));
        assert!(text.contains("not json at all"));

        let summary = agg.into_summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 2);
    }

    #[tokio::test]
    async fn test_scope_events_counted_as_discarded() {
        let input = concat!(
            r#"{"Action":"start","Package":"pkg"}"#,
            "\n",
            r#"{"Action":"run","Package":"pkg","Test":"TestA"}"#,
            "\n",
            r#"{"Action":"fail","Package":"pkg","Elapsed":0.1}"#,
            "\n",
        );
        let agg = Aggregator::new();
        let stats = consume_structured(input.as_bytes(), &agg, tokio::io::sink())
            .await
            .unwrap();

        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.applied, 1);
        assert_eq!(agg.snapshot().results[0].status, TestStatus::Running);
    }

    #[tokio::test]
    async fn test_crlf_and_missing_final_newline() {
        let input = format!("{}\r\n{}", PASS_A, PASS_B);
        let agg = Aggregator::new();
        let stats = consume_structured(input.as_bytes(), &agg, tokio::io::sink())
            .await
            .unwrap();
        assert_eq!(stats.malformed, 0);
        assert_eq!(agg.snapshot().passed, 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_warning_not_an_error() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(PASS_A.as_bytes());
        let agg = Aggregator::new();
        let mut warnings = Vec::new();

        let stats = consume_structured(&input[..], &agg, &mut warnings)
            .await
            .unwrap();
        assert_eq!(stats.malformed, 1);
        assert_eq!(agg.snapshot().passed, 1);
    }

    #[tokio::test]
    async fn test_passthrough_is_verbatim() {
        let input: &[u8] = b"# example.com/pkg\n./x.go:3:2: undefined: y\n\xff raw\n";
        let mut out = Vec::new();

        let stats = consume_passthrough(input, &mut out).await.unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_passthrough_keeps_crlf_and_unterminated_tail() {
        let input: &[u8] = b"a\r\nb";
        let mut out = Vec::new();

        let stats = consume_passthrough(input, &mut out).await.unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(out, input);
    }

    #[test]
    fn test_warning_prefix_is_styled() {
        let prefix = warning_prefix();
        assert_eq!(prefix.input, "Warning:");
        assert_eq!(prefix.fgcolor, Some(colored::Color::Yellow));
        assert!(prefix.style.contains(colored::Styles::Bold));
    }

    #[tokio::test]
    async fn test_empty_streams() {
        let agg = Aggregator::new();
        let stats = consume_structured(&b""[..], &agg, tokio::io::sink())
            .await
            .unwrap();
        assert_eq!(stats, ConsumeStats::default());

        let mut out = Vec::new();
        let stats = consume_passthrough(&b""[..], &mut out).await.unwrap();
        assert_eq!(stats.lines, 0);
        assert!(out.is_empty());
    }
}
