mod client;

pub use client::{LrclibApi, LrclibClient, LrclibLyrics, LrclibTrack, LRCLIB_API_URL};

use async_trait::async_trait;
use lyrisync_core::cjk::passes_cjk_filter;
use lyrisync_core::plain::estimate_timing;
use lyrisync_core::{
    parse_timed_text, LyricsCandidate, LyricsConfig, LyricsProvider, LyricsQuery, SourceTier,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyrisync::provider::lrclib";
const SOURCE: &str = "lrclib";

/// Which lyrics an [`LrclibProvider`] takes from each track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrclibMode {
    /// Authored timestamps from `syncedLyrics`
    Synced,
    /// Estimated timing for tracks that only have `plainLyrics`
    Plain,
}

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    api: Arc<dyn LrclibApi>,
    mode: LrclibMode,
}

impl LrclibProvider {
    pub fn new(api: Arc<dyn LrclibApi>, mode: LrclibMode) -> Self {
        Self { api, mode }
    }

    /// Provider for synced lyrics
    pub fn synced(api: Arc<dyn LrclibApi>) -> Self {
        Self::new(api, LrclibMode::Synced)
    }

    /// Provider for plain lyrics with estimated timing
    pub fn plain(api: Arc<dyn LrclibApi>) -> Self {
        Self::new(api, LrclibMode::Plain)
    }

    fn build_candidate(
        &self,
        track: &LrclibTrack,
        lyrics: &LrclibLyrics,
        query: &LyricsQuery,
        config: &LyricsConfig,
    ) -> Option<LyricsCandidate> {
        let synced = non_blank(lyrics.synced_lyrics.as_deref());
        let title = track.track_name.as_deref().unwrap_or(&query.title);
        let artist = track.artist_name.as_deref().unwrap_or(&query.artist);
        let album = track.album_name.as_deref().unwrap_or_default();

        let candidate = match self.mode {
            LrclibMode::Synced => {
                let text = synced?;
                if !passes_cjk_filter(text, config.filter_cjk_lyrics) {
                    debug!(target: LOG_TARGET, "Filtered CJK lyrics (lrclib id: {})", track.id);
                    return None;
                }
                LyricsCandidate::synced(SOURCE, parse_timed_text(text), title, artist)
            }
            LrclibMode::Plain => {
                // Tracks with synced lyrics are covered by the synced provider
                if synced.is_some() {
                    return None;
                }
                let text = non_blank(lyrics.plain_lyrics.as_deref())?;
                if !passes_cjk_filter(text, config.filter_cjk_lyrics) {
                    debug!(target: LOG_TARGET, "Filtered CJK lyrics (lrclib id: {})", track.id);
                    return None;
                }
                let duration_ms = if query.duration_ms > 0 {
                    query.duration_ms
                } else {
                    track_duration_ms(track)
                };
                LyricsCandidate::estimated(SOURCE, estimate_timing(text, duration_ms), title, artist)
            }
        };

        (!candidate.lines.is_empty()).then(|| candidate.with_album(album))
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn track_duration_ms(track: &LrclibTrack) -> u64 {
    track
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map_or(0, |d| (d * 1000.0) as u64)
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        match self.mode {
            LrclibMode::Synced => "lrclib",
            LrclibMode::Plain => "lrclib (plain)",
        }
    }

    fn tier(&self) -> SourceTier {
        match self.mode {
            LrclibMode::Synced => SourceTier::RemoteSynced,
            LrclibMode::Plain => SourceTier::RemotePlain,
        }
    }

    async fn provide(&self, query: &LyricsQuery, config: &LyricsConfig) -> Vec<LyricsCandidate> {
        info!(
            target: LOG_TARGET,
            "Searching LRCLIB for: {} - {} ({:?} mode)", query.artist, query.title, self.mode
        );

        let tracks = match self.api.search(&query.title, &query.artist).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(target: LOG_TARGET, "LRCLIB search failed: {}", e);
                return Vec::new();
            }
        };
        debug!(target: LOG_TARGET, "LRCLIB search returned {} tracks", tracks.len());

        let mut candidates = Vec::new();
        for track in tracks.iter().filter(|t| !t.instrumental) {
            let lyrics = match self.api.get(track.id).await {
                Ok(lyrics) => lyrics,
                Err(e) => {
                    warn!(target: LOG_TARGET, "LRCLIB get failed (id: {}): {}", track.id, e);
                    continue;
                }
            };
            if let Some(candidate) = self.build_candidate(track, &lyrics, query, config) {
                candidates.push(candidate);
            }
        }

        candidates
    }
}
