//! Match scoring of lyrics candidates against a query.

use crate::provider::{LyricsCandidate, LyricsQuery};

const TITLE_WEIGHT: f64 = 1000.0;
const ARTIST_WEIGHT: f64 = 500.0;
const DURATION_WEIGHT: f64 = 500.0;
const MAX_LINE_BONUS: usize = 100;
const ESTIMATED_PENALTY: i64 = 200;
const PLAIN_PENALTY: i64 = 300;

/// Minimum score for remote candidates on a trustworthy title
pub const DEFAULT_THRESHOLD: i64 = 800;
/// Minimum score when the title comes from a noisy source (e.g. a browser tab)
pub const LOW_TRUST_THRESHOLD: i64 = 200;

/// Characters that split titles and artists into words
const WORD_SEPARATORS: &[char] = &['-', '_', '(', ')', '[', ']'];

/// Bonus that keeps provider order when everything else ties
#[must_use]
pub fn source_priority(source: &str) -> i64 {
    match source.to_lowercase().as_str() {
        "cache" => 50,
        "localdb" | "lrclib (local)" => 40,
        "lrclib" => 30,
        "netease" => 20,
        _ => 10,
    }
}

/// Fuzzy similarity in `[0.0, 1.0]` between two titles or artist names.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let words_a = split_words(&a);
    let words_b = split_words(&b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let matches = words_a
        .iter()
        .filter(|wa| words_b.iter().any(|wb| wb.contains(*wa) || wa.contains(wb)))
        .count();

    matches as f64 / words_a.len().max(words_b.len()) as f64
}

fn split_words(s: &str) -> Vec<&str> {
    s.split(|c: char| c.is_whitespace() || WORD_SEPARATORS.contains(&c))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Score a candidate against the query it was fetched for. Higher is better.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn score_candidate(candidate: &LyricsCandidate, query: &LyricsQuery) -> i64 {
    let mut score = source_priority(&candidate.source);

    score += (similarity(&candidate.title, &query.title) * TITLE_WEIGHT) as i64;
    score += (similarity(&candidate.artist, &query.artist) * ARTIST_WEIGHT) as i64;

    let last = candidate.last_timestamp_ms();
    if query.duration_ms > 0 && last > 0 {
        let ratio = last.min(query.duration_ms) as f64 / last.max(query.duration_ms) as f64;
        score += (ratio * DURATION_WEIGHT) as i64;
    }

    // More lines suggests more complete lyrics
    score += i64::try_from(candidate.lines.len().min(MAX_LINE_BONUS)).unwrap_or_default();

    if candidate.is_estimated {
        score -= ESTIMATED_PENALTY;
    }
    if candidate.is_plain {
        score -= PLAIN_PENALTY;
    }

    score
}

/// Acceptance threshold for remote candidates
#[must_use]
pub const fn acceptance_threshold(low_trust_title: bool) -> i64 {
    if low_trust_title {
        LOW_TRUST_THRESHOLD
    } else {
        DEFAULT_THRESHOLD
    }
}
