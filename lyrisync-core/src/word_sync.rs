//! Word-level highlight timing reconstructed from line timestamps.
//!
//! Each token of the current line gets a highlight duration proportional to
//! its alphanumeric weight, followed by a short pause after punctuation.
//! The active token stays highlighted through its own trailing pause.

use crate::cjk::{contains_cjk, is_cjk_char};
use crate::lrc::{current_line_index, LyricLine};
use serde::{Deserialize, Serialize};

/// Lines at least this long are assumed to contain trailing silence
const LONG_PAUSE_THRESHOLD_MS: u64 = 2000;
/// Share of a long line that is actually sung
const SPOKEN_PORTION_CAP: f64 = 0.75;
const MIN_WORD_MS: f64 = 120.0;
const MAX_WORD_MS: f64 = 500.0;

const COMMA_PAUSE_MS: f64 = 150.0;
const MID_PAUSE_MS: f64 = 180.0;
const FULL_STOP_PAUSE_MS: f64 = 250.0;

const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 1.0;

/// Markup wrapped around the active token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMarker {
    #[serde(default = "default_open")]
    pub highlight_open: String,
    #[serde(default = "default_close")]
    pub highlight_close: String,
}

fn default_open() -> String {
    "<color=yellow>".to_string()
}

fn default_close() -> String {
    "</color>".to_string()
}

impl Default for HighlightMarker {
    fn default() -> Self {
        Self {
            highlight_open: default_open(),
            highlight_close: default_close(),
        }
    }
}

impl HighlightMarker {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            highlight_open: open.into(),
            highlight_close: close.into(),
        }
    }

    fn wrap(&self, token: &str) -> String {
        format!("{}{token}{}", self.highlight_open, self.highlight_close)
    }
}

/// Token layout of one line across its interval
#[derive(Debug, Clone)]
pub struct WordTimeline {
    tokens: Vec<String>,
    /// Alternating highlight-end / pause-end offsets, two per token
    boundaries: Vec<f64>,
}

impl WordTimeline {
    /// Lay out `text` across `interval_ms`. `None` if the line has no tokens.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(text: &str, interval_ms: u64) -> Option<Self> {
        let tokens = tokenize(text);
        if tokens.is_empty() || interval_ms == 0 {
            return None;
        }

        let count = tokens.len() as u64;
        let weights: Vec<usize> = tokens.iter().map(|t| token_weight(t)).collect();
        let total_weight = weights.iter().sum::<usize>().max(1) as f64;

        let window = content_window(interval_ms, count) as f64;

        let mut highlight: Vec<f64> = weights
            .iter()
            .map(|&w| (window * w as f64 / total_weight).clamp(MIN_WORD_MS, MAX_WORD_MS))
            .collect();
        let pauses: Vec<f64> = tokens.iter().map(|t| pause_after(t)).collect();

        let highlight_sum: f64 = highlight.iter().sum();
        let pause_sum: f64 = pauses.iter().sum();
        if highlight_sum + pause_sum > window && highlight_sum > 0.0 {
            let scale = ((window - pause_sum) / highlight_sum).clamp(MIN_SCALE, MAX_SCALE);
            for dur in &mut highlight {
                *dur *= scale;
            }
        }

        let mut boundaries = Vec::with_capacity(tokens.len() * 2);
        let mut acc = 0.0;
        for (dur, pause) in highlight.iter().zip(&pauses) {
            acc += dur;
            boundaries.push(acc);
            acc += pause;
            boundaries.push(acc);
        }

        Some(Self { tokens, boundaries })
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Offset at which the last token's pause ends
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.boundaries.last().copied().unwrap_or_default()
    }

    /// Token highlighted `elapsed_ms` after line start, if any
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn active_token(&self, elapsed_ms: u64) -> Option<usize> {
        let elapsed = elapsed_ms as f64;
        if elapsed >= self.total_ms() {
            return None;
        }

        let segment = self.boundaries.partition_point(|&end| end < elapsed);
        // Highlight and trailing pause segments map to the same token
        Some((segment / 2).min(self.tokens.len() - 1))
    }

    /// Tokens joined by single spaces with the active one wrapped
    #[must_use]
    pub fn render(&self, active: usize, marker: &HighlightMarker) -> String {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if i == active {
                    marker.wrap(token)
                } else {
                    token.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render the line active at `position_ms` with its current word highlighted.
///
/// `None` before the first line, on the last line (no following timestamp),
/// and once the line's words and pauses have all elapsed.
#[must_use]
pub fn word_sync_line(
    lines: &[LyricLine],
    position_ms: u64,
    marker: &HighlightMarker,
) -> Option<String> {
    let idx = current_line_index(lines, position_ms)?;
    let current = &lines[idx];
    let next = lines.get(idx + 1)?;

    let interval = next.timestamp_ms.checked_sub(current.timestamp_ms)?;
    let timeline = WordTimeline::build(&current.text, interval)?;

    let elapsed = position_ms.checked_sub(current.timestamp_ms)?;
    let active = timeline.active_token(elapsed)?;
    Some(timeline.render(active, marker))
}

/// Split a line into highlightable tokens.
///
/// Non-CJK text splits on spaces. Text containing CJK splits per CJK
/// character while runs of other characters (e.g. romaji) stay whole.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    if !contains_cjk(text) {
        return text
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut tokens = Vec::new();
    let mut pending = String::new();

    for c in text.chars() {
        if c.is_whitespace() {
            flush(&mut pending, &mut tokens);
        } else if is_cjk_char(c) {
            flush(&mut pending, &mut tokens);
            tokens.push(c.to_string());
        } else {
            pending.push(c);
        }
    }
    flush(&mut pending, &mut tokens);

    tokens
}

fn flush(pending: &mut String, tokens: &mut Vec<String>) {
    if !pending.is_empty() {
        tokens.push(std::mem::take(pending));
    }
}

/// Alphanumeric character count, at least 1
fn token_weight(token: &str) -> usize {
    token.chars().filter(|c| c.is_alphanumeric()).count().max(1)
}

fn pause_after(token: &str) -> f64 {
    match token.chars().last() {
        Some(',') => COMMA_PAUSE_MS,
        Some(';' | ':') => MID_PAUSE_MS,
        Some('.' | '!' | '?') => FULL_STOP_PAUSE_MS,
        _ => 0.0,
    }
}

/// Time available for the tokens themselves
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn content_window(interval_ms: u64, token_count: u64) -> u64 {
    if interval_ms < LONG_PAUSE_THRESHOLD_MS {
        return interval_ms;
    }

    let by_portion = (interval_ms as f64 * SPOKEN_PORTION_CAP) as u64;
    let by_tokens = token_count.saturating_mul(MAX_WORD_MS as u64);
    let floor = interval_ms.min(token_count.saturating_mul(MIN_WORD_MS as u64));

    by_portion.min(by_tokens).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> HighlightMarker {
        HighlightMarker::new("<b>", "</b>")
    }

    fn two_lines(text: &str, interval: u64) -> Vec<LyricLine> {
        vec![
            LyricLine::new(10_000, text),
            LyricLine::new(10_000 + interval, "next line"),
        ]
    }

    #[test]
    fn test_hello_world_highlight_sequence() {
        let lines = two_lines("Hello, world", 1000);
        let m = marker();

        // "Hello," gets 425ms after scaling, then its 150ms comma pause
        assert_eq!(word_sync_line(&lines, 10_000, &m).as_deref(), Some("<b>Hello,</b> world"));
        assert_eq!(word_sync_line(&lines, 10_400, &m).as_deref(), Some("<b>Hello,</b> world"));
        assert_eq!(word_sync_line(&lines, 10_500, &m).as_deref(), Some("<b>Hello,</b> world"));
        assert_eq!(word_sync_line(&lines, 10_575, &m).as_deref(), Some("<b>Hello,</b> world"));
        assert_eq!(word_sync_line(&lines, 10_576, &m).as_deref(), Some("Hello, <b>world</b>"));
        assert_eq!(word_sync_line(&lines, 10_999, &m).as_deref(), Some("Hello, <b>world</b>"));
    }

    #[test]
    fn test_outside_line_is_empty() {
        let lines = two_lines("Hello, world", 1000);
        let m = marker();

        assert_eq!(word_sync_line(&lines, 9_999, &m), None);
        assert_eq!(word_sync_line(&lines, 11_000, &m), None);
        assert_eq!(word_sync_line(&lines, 50_000, &m), None);
        assert_eq!(word_sync_line(&[], 0, &m), None);
    }

    #[test]
    fn test_last_line_has_no_word_sync() {
        let lines = vec![LyricLine::new(0, "only line")];
        assert_eq!(word_sync_line(&lines, 100, &marker()), None);
    }

    #[test]
    fn test_zero_interval_is_empty() {
        let lines = vec![LyricLine::new(5000, "a b"), LyricLine::new(5000, "c d")];
        // Position lands on the second of two equal stamps, which is the last line
        assert_eq!(word_sync_line(&lines, 5000, &marker()), None);
        assert!(WordTimeline::build("a b", 0).is_none());
    }

    #[test]
    fn test_long_interval_caps_content_window() {
        // 10s interval, 2 tokens: window = min(7500, 1000) = 1000, each word 500ms
        let timeline = WordTimeline::build("ab cd", 10_000).unwrap();
        assert!((timeline.total_ms() - 1000.0).abs() < 1e-9);
        assert_eq!(timeline.active_token(0), Some(0));
        assert_eq!(timeline.active_token(501), Some(1));
        assert_eq!(timeline.active_token(1000), None);
    }

    #[test]
    fn test_weights_follow_alphanumeric_length() {
        // 1500ms window split 1:2 over weights a=4, b=8 -> 500 and 1000, clamped to 500 each
        let timeline = WordTimeline::build("abcd efghijkl", 1500).unwrap();
        assert!((timeline.total_ms() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_tokenize_latin() {
        assert_eq!(tokenize("  Hello   there world "), vec!["Hello", "there", "world"]);
    }

    #[test]
    fn test_tokenize_cjk_mixed() {
        assert_eq!(
            tokenize("愛してる love you"),
            vec!["愛", "し", "て", "る", "love", "you"]
        );
        assert_eq!(tokenize("君(kimi)の声"), vec!["君", "(kimi)", "の", "声"]);
    }

    #[test]
    fn test_pause_after() {
        assert!((pause_after("word,") - 150.0).abs() < f64::EPSILON);
        assert!((pause_after("word;") - 180.0).abs() < f64::EPSILON);
        assert!((pause_after("word:") - 180.0).abs() < f64::EPSILON);
        assert!((pause_after("word!") - 250.0).abs() < f64::EPSILON);
        assert!(pause_after("word").abs() < f64::EPSILON);
    }

    #[test]
    fn test_token_weight_minimum() {
        assert_eq!(token_weight("..."), 1);
        assert_eq!(token_weight("don't"), 4);
    }

    #[test]
    fn test_content_window() {
        assert_eq!(content_window(1500, 10), 1500);
        assert_eq!(content_window(4000, 10), 3000);
        assert_eq!(content_window(4000, 2), 1000);
        // Floor keeps at least 120ms per token
        assert_eq!(content_window(2000, 40), 2000);
    }

    #[test]
    fn test_default_marker() {
        let lines = two_lines("la", 1000);
        assert_eq!(
            word_sync_line(&lines, 10_000, &HighlightMarker::default()).as_deref(),
            Some("<color=yellow>la</color>")
        );
    }
}
