//! Synthetic timing for plain (unsynchronized) lyrics.
//!
//! Lines get a share of the song proportional to their character count,
//! leaving a buffer at the start and end of the track.

use crate::lrc::LyricLine;

/// Minimum time a single line is shown
const MIN_LINE_MS: i64 = 1500;
/// Maximum time a single line is shown
const MAX_LINE_MS: i64 = 8000;
/// Gap inserted after every line
const GAP_MS: i64 = 200;
/// Lines stop once the clock passes `duration - END_GUARD_MS`
const END_GUARD_MS: i64 = 500;
/// Budgets below this fall back to the whole duration
const MIN_BUDGET_MS: i64 = 1000;

const START_BUFFER_RATIO: f64 = 0.05;
const END_BUFFER_RATIO: f64 = 0.10;

const SECTION_MARKERS: &[&str] = &[
    "verse",
    "chorus",
    "bridge",
    "intro",
    "outro",
    "hook",
    "pre-chorus",
    "prechorus",
    "refrain",
    "interlude",
    "instrumental",
    "solo",
    "breakdown",
];

/// Assign estimated timestamps to plain lyrics spread over `duration_ms`.
///
/// Returns no lines when nothing but blank lines and section markers remain.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn estimate_timing(plain: &str, duration_ms: u64) -> Vec<LyricLine> {
    let lines: Vec<&str> = plain
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_section_marker(l))
        .collect();

    if lines.is_empty() {
        return Vec::new();
    }

    let duration = i64::try_from(duration_ms).unwrap_or(i64::MAX);
    let char_counts: Vec<usize> = lines.iter().map(|l| l.chars().count().max(1)).collect();
    let total_chars: usize = char_counts.iter().sum();

    let start_buffer = (duration as f64 * START_BUFFER_RATIO) as i64;
    let end_buffer = (duration as f64 * END_BUFFER_RATIO) as i64;
    let mut budget = duration - start_buffer - end_buffer;
    if budget < MIN_BUDGET_MS {
        budget = duration;
    }

    let mut result = Vec::with_capacity(lines.len());
    let mut clock = start_buffer;

    for (text, chars) in lines.into_iter().zip(char_counts) {
        let weight = chars as f64 / total_chars as f64;
        let line_ms = ((budget as f64 * weight) as i64).clamp(MIN_LINE_MS, MAX_LINE_MS);

        result.push(LyricLine::new(clock.max(0) as u64, text));

        clock += line_ms + GAP_MS;
        if clock > duration - END_GUARD_MS {
            break;
        }
    }

    result
}

/// Structural markers such as "Chorus", "Verse 2" or "[Bridge]"
fn is_section_marker(line: &str) -> bool {
    let lower = line.trim().to_lowercase();

    if lower.starts_with('[') && lower.ends_with(']') {
        return true;
    }

    let lower = lower.trim_end_matches(':').trim_end();
    SECTION_MARKERS.iter().any(|marker| {
        lower.strip_prefix(marker).is_some_and(|rest| {
            // Bare marker, or marker + whitespace + number
            rest.is_empty()
                || (rest.starts_with(char::is_whitespace)
                    && rest.trim_start().bytes().all(|b| b.is_ascii_digit()))
        })
    })
}
