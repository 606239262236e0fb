use crate::config::LyricsConfig;
use crate::lrc::LyricLine;
use async_trait::async_trait;

/// Source tag of candidates served from the lyrics cache
pub const CACHE_SOURCE: &str = "cache";
/// Source tag of candidates served from the local lyrics database
pub const LOCAL_DB_SOURCE: &str = "localdb";

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track name
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Track duration in milliseconds, 0 when unknown
    pub duration_ms: u64,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            duration_ms: 0,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// One candidate set of timed lyrics produced by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsCandidate {
    /// Lines ordered by timestamp
    pub lines: Vec<LyricLine>,
    /// Provider tag, e.g. "cache", "localdb", "lrclib", "netease"
    pub source: String,
    pub artist: String,
    pub title: String,
    pub album: String,
    /// Timing was synthesized rather than authored
    pub is_estimated: bool,
    /// Built from plain (unsynchronized) text
    pub is_plain: bool,
}

impl LyricsCandidate {
    /// Create a synced candidate with authored timing
    pub fn synced(
        source: impl Into<String>,
        lines: Vec<LyricLine>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            lines,
            source: source.into(),
            artist: artist.into(),
            title: title.into(),
            album: String::new(),
            is_estimated: false,
            is_plain: false,
        }
    }

    /// Create a candidate whose timing was estimated from plain text
    pub fn estimated(
        source: impl Into<String>,
        lines: Vec<LyricLine>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            is_estimated: true,
            is_plain: true,
            ..Self::synced(source, lines, title, artist)
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    /// Source tag with an "(estimated)" or "(plain)" suffix
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_estimated {
            format!("{} (estimated)", self.source)
        } else if self.is_plain {
            format!("{} (plain)", self.source)
        } else {
            self.source.clone()
        }
    }

    /// Timestamp of the last line, 0 when empty
    #[must_use]
    pub fn last_timestamp_ms(&self) -> u64 {
        self.lines.last().map_or(0, |l| l.timestamp_ms)
    }
}

/// Fixed position of a provider in the fetch order.
///
/// Providers are queried in ascending tier order. Remote tiers are skipped
/// in offline mode; the plain tier only runs with plain fallback enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceTier {
    Cache,
    LocalDatabase,
    RemoteSynced,
    RemoteAlternate,
    RemotePlain,
}

impl SourceTier {
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(
            self,
            Self::RemoteSynced | Self::RemoteAlternate | Self::RemotePlain
        )
    }

    /// Whether this tier runs under the given configuration
    #[must_use]
    pub fn enabled_by(self, config: &LyricsConfig) -> bool {
        if self.is_remote() && config.offline_mode {
            return false;
        }
        !matches!(self, Self::RemotePlain) || config.plain_lyrics_fallback
    }
}

/// Trait for lyrics providers.
///
/// `provide` never fails: implementations log their own errors and return
/// an empty list instead.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Position in the fetch order
    fn tier(&self) -> SourceTier;

    /// Whether the provider can currently serve lookups
    fn is_available(&self) -> bool {
        true
    }

    /// Produce zero or more candidates for a query
    async fn provide(&self, query: &LyricsQuery, config: &LyricsConfig) -> Vec<LyricsCandidate>;
}
