//! Timed-text (LRC-style) parsing and serialization.

use std::fmt::Write;

/// A single line of lyrics with its start time in milliseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub timestamp_ms: u64,
    pub text: String,
}

impl LyricLine {
    pub fn new(timestamp_ms: u64, text: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            text: text.into(),
        }
    }
}

/// Parse timed text into lines sorted by timestamp.
///
/// Every `[mm:ss.ff]` or `[mm:ss.fff]` tag at the start of a line yields one
/// output line carrying the tag-stripped text. Lines without a leading tag
/// (ID tags such as `[ar:Artist]`, free text, malformed stamps) are skipped,
/// as are lines whose text is blank.
#[must_use]
pub fn parse_timed_text(input: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in input.lines() {
        if let Some(parsed) = parse_lyric_line(raw.trim()) {
            lines.extend(parsed);
        }
    }

    // Stable: lines sharing a timestamp keep their emission order
    lines.sort_by_key(|l| l.timestamp_ms);
    lines
}

/// Index of the last line starting at or before `position_ms`.
///
/// `lines` must be sorted by timestamp.
#[must_use]
pub fn current_line_index(lines: &[LyricLine], position_ms: u64) -> Option<usize> {
    lines
        .partition_point(|line| line.timestamp_ms <= position_ms)
        .checked_sub(1)
}

/// Serialize lines back to timed text with millisecond precision.
#[must_use]
pub fn serialize_timed_text(lines: &[LyricLine]) -> String {
    let mut output = String::new();
    for line in lines {
        let _ = writeln!(output, "[{}]{}", format_timestamp(line.timestamp_ms), line.text);
    }
    output
}

/// Format milliseconds as an LRC timestamp (mm:ss.fff)
fn format_timestamp(timestamp_ms: u64) -> String {
    let minutes = timestamp_ms / 60_000;
    let seconds = (timestamp_ms / 1000) % 60;
    let millis = timestamp_ms % 1000;

    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// Parse a lyric line like [00:12.34]Hello world or [00:12.34][00:15.67]Same lyrics
fn parse_lyric_line(line: &str) -> Option<Vec<LyricLine>> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    // Extract all timestamps at the beginning
    while remaining.starts_with('[') {
        let Some(end) = remaining.find(']') else {
            break;
        };
        let Some(time) = parse_timestamp(&remaining[1..end]) else {
            break;
        };
        timestamps.push(time);
        remaining = remaining[end + 1..].trim_start();
    }

    if timestamps.is_empty() {
        return None;
    }

    let text = remaining.trim();
    if text.is_empty() {
        return None;
    }

    Some(
        timestamps
            .into_iter()
            .map(|timestamp_ms| LyricLine::new(timestamp_ms, text))
            .collect(),
    )
}

/// Parse "mm:ss.ff" or "mm:ss.fff" into milliseconds
fn parse_timestamp(s: &str) -> Option<u64> {
    let (minutes, rest) = s.split_once(':')?;
    let (seconds, fraction) = rest.split_once('.')?;

    if minutes.is_empty() || !all_digits(minutes) {
        return None;
    }
    if seconds.len() != 2 || !all_digits(seconds) {
        return None;
    }
    if !matches!(fraction.len(), 2 | 3) || !all_digits(fraction) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let mut millis: u64 = fraction.parse().ok()?;
    // Hundredths: right-pad to milliseconds
    if fraction.len() == 2 {
        millis *= 10;
    }

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000)?
        .checked_add(millis)
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
