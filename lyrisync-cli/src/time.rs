//! Playback clock helpers.

use std::time::Duration;

/// Extension trait for saturating Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Format a playback position as `m:ss.mmm`
#[must_use]
pub fn format_position(position_ms: u64) -> String {
    let minutes = position_ms / 60_000;
    let seconds = (position_ms % 60_000) / 1000;
    let millis = position_ms % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_u64() {
        assert_eq!(Duration::from_millis(1234).as_millis_u64(), 1234);
        assert_eq!(Duration::ZERO.as_millis_u64(), 0);
        assert_eq!(Duration::MAX.as_millis_u64(), u64::MAX);
    }

    #[test]
    fn test_format_position() {
        assert_eq!(format_position(0), "0:00.000");
        assert_eq!(format_position(61_005), "1:01.005");
        assert_eq!(format_position(754_250), "12:34.250");
    }
}
