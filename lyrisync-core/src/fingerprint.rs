//! Content fingerprints used to drop duplicate candidates.

use crate::lrc::LyricLine;

/// Number of non-blank lines that make up a fingerprint
const FINGERPRINT_LINES: usize = 5;

/// ASCII unit separator; does not occur in lyrics
const SEPARATOR: &str = "\u{1F}";

/// Canonical signature of a candidate's first five non-blank lines.
///
/// Empty when the candidate has no non-blank line at all.
#[must_use]
pub fn fingerprint(lines: &[LyricLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.trim())
        .filter(|t| !t.is_empty())
        .take(FINGERPRINT_LINES)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
