//! CJK character classification shared by providers and word sync.

/// Ratio of CJK characters above which text counts as mostly CJK
const CJK_MAJORITY_RATIO: f64 = 0.3;

/// CJK Unified Ideographs, Hiragana, Katakana or Hangul syllables
#[must_use]
pub const fn is_cjk_char(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{AC00}'..='\u{D7AF}'
    )
}

#[must_use]
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

/// Whether more than 30% of the alphanumeric or non-ASCII characters are CJK.
#[must_use]
pub fn is_mostly_cjk(text: &str) -> bool {
    let mut total = 0_u32;
    let mut cjk = 0_u32;

    for c in text.chars() {
        if c.is_alphanumeric() || !c.is_ascii() {
            total += 1;
            if is_cjk_char(c) {
                cjk += 1;
            }
        }
    }

    total > 0 && f64::from(cjk) / f64::from(total) > CJK_MAJORITY_RATIO
}

/// Language filter applied by providers: passes everything when disabled.
#[must_use]
pub fn passes_cjk_filter(text: &str, filter_enabled: bool) -> bool {
    !filter_enabled || !is_mostly_cjk(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_ranges() {
        assert!(is_cjk_char('你'));
        assert!(is_cjk_char('ひ'));
        assert!(is_cjk_char('カ'));
        assert!(is_cjk_char('한'));
        assert!(!is_cjk_char('a'));
        assert!(!is_cjk_char('é'));
        assert!(!is_cjk_char('，'));
    }

    #[test]
    fn test_forty_percent_cjk_is_filtered_only_when_enabled() {
        // 2 CJK out of 5 counted characters
        let text = "你好 abc!";
        assert!(is_mostly_cjk(text));
        assert!(!passes_cjk_filter(text, true));
        assert!(passes_cjk_filter(text, false));
    }

    #[test]
    fn test_latin_text_passes() {
        assert!(!is_mostly_cjk("Never gonna give you up"));
        assert!(passes_cjk_filter("Never gonna give you up", true));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 3 CJK out of 10 counted characters = exactly 0.3
        assert!(!is_mostly_cjk("你好吗abcdefg"));
    }

    #[test]
    fn test_empty_text_is_not_cjk() {
        assert!(!is_mostly_cjk(""));
        assert!(!is_mostly_cjk("... !!!"));
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("love 愛"));
        assert!(!contains_cjk("love"));
    }
}
