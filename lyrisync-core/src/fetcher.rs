//! Lyrics fetcher that orchestrates multiple lyrics providers.
//!
//! A fetch queries every enabled provider in tier order, scores and
//! deduplicates their candidates, and keeps the best one selected. Each
//! fetch bumps a generation counter; work belonging to an older generation,
//! or to a query that is no longer current, is dropped at the next check.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

use crate::cache::LyricsStore;
use crate::config::LyricsConfig;
use crate::error::Result;
use crate::events::{FetchEvent, FetchObserver, RejectReason, TracingObserver};
use crate::fingerprint::fingerprint;
use crate::lrc::{current_line_index, LyricLine};
use crate::provider::{LyricsCandidate, LyricsProvider, LyricsQuery, CACHE_SOURCE, LOCAL_DB_SOURCE};
use crate::score::{acceptance_threshold, score_candidate};
use crate::word_sync::{word_sync_line, HighlightMarker};

const LOG_TARGET: &str = "lyrisync::fetcher";

/// Label reported when no lyrics are loaded
pub const NO_SOURCE_LABEL: &str = "None";

/// How a fetch call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// All providers ran; `total` candidates were accepted
    Completed { total: usize },
    /// A newer fetch or a forced refetch superseded this call
    Cancelled,
}

struct ScoredCandidate {
    candidate: LyricsCandidate,
    score: i64,
    fingerprint: String,
}

#[derive(Default)]
struct FetchSession {
    title: String,
    artist: String,
    generation: u64,
    results: Vec<ScoredCandidate>,
    selected: usize,
}

impl FetchSession {
    fn is_current(&self, generation: u64, query: &LyricsQuery) -> bool {
        self.generation == generation && self.title == query.title && self.artist == query.artist
    }

    fn selected(&self) -> Option<&ScoredCandidate> {
        self.results.get(self.selected)
    }
}

enum Acceptance {
    Accepted { index: usize, selected: bool },
    Rejected(RejectReason),
    Stale,
}

/// Resolves lyrics for one song at a time and serves line lookups
pub struct LyricsFetcher {
    providers: Vec<Box<dyn LyricsProvider>>,
    store: Arc<dyn LyricsStore>,
    observer: Arc<dyn FetchObserver>,
    config: RwLock<LyricsConfig>,
    marker: HighlightMarker,
    session: RwLock<FetchSession>,
}

impl LyricsFetcher {
    /// Create a new lyrics fetcher
    ///
    /// # Arguments
    /// * `providers` - Lyrics providers; they are queried in tier order
    /// * `store` - Cache that receives the best result of each fetch
    /// * `config` - Settings forwarded to every provider call
    #[must_use]
    pub fn new(
        mut providers: Vec<Box<dyn LyricsProvider>>,
        store: Arc<dyn LyricsStore>,
        config: LyricsConfig,
    ) -> Self {
        providers.sort_by_key(|p| p.tier());

        Self {
            providers,
            store,
            observer: Arc::new(TracingObserver),
            config: RwLock::new(config),
            marker: HighlightMarker::default(),
            session: RwLock::new(FetchSession::default()),
        }
    }

    /// Replace the default `tracing` observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the markup used by [`Self::current_line_word_sync`]
    #[must_use]
    pub fn with_highlight_marker(mut self, marker: HighlightMarker) -> Self {
        self.marker = marker;
        self
    }

    /// Snapshot of the current configuration
    #[must_use]
    pub fn config(&self) -> LyricsConfig {
        self.config.read().clone()
    }

    /// Replace the configuration; takes effect on the next fetch
    pub fn set_config(&self, config: LyricsConfig) {
        *self.config.write() = config;
    }

    fn emit(&self, event: &FetchEvent) {
        self.observer.on_event(event);
    }

    fn is_current(&self, generation: u64, query: &LyricsQuery) -> bool {
        self.session.read().is_current(generation, query)
    }

    fn cancelled(&self, generation: u64) -> FetchOutcome {
        self.emit(&FetchEvent::Cancelled { generation });
        FetchOutcome::Cancelled
    }

    /// Fetch lyrics for a song, replacing the current results.
    ///
    /// `low_trust_title` lowers the acceptance threshold for titles taken
    /// from noisy metadata.
    pub async fn fetch(
        &self,
        title: &str,
        artist: &str,
        duration_ms: u64,
        low_trust_title: bool,
    ) -> FetchOutcome {
        let query = LyricsQuery::new(title, artist).with_duration_ms(duration_ms);
        let generation = {
            let mut session = self.session.write();
            session.generation += 1;
            session.title = query.title.clone();
            session.artist = query.artist.clone();
            session.results.clear();
            session.selected = 0;
            session.generation
        };
        self.emit(&FetchEvent::Started {
            title: query.title.clone(),
            artist: query.artist.clone(),
            generation,
        });

        let config = self.config();
        let threshold = acceptance_threshold(low_trust_title);

        for provider in &self.providers {
            if !self.is_current(generation, &query) {
                return self.cancelled(generation);
            }

            let tier = provider.tier();
            if !tier.enabled_by(&config) {
                let reason = if tier.is_remote() && config.offline_mode {
                    "offline mode"
                } else {
                    "plain lyrics fallback disabled"
                };
                self.emit(&FetchEvent::SourceSkipped {
                    provider: provider.name(),
                    reason,
                });
                continue;
            }
            if !provider.is_available() {
                self.emit(&FetchEvent::SourceSkipped {
                    provider: provider.name(),
                    reason: "unavailable",
                });
                continue;
            }

            self.emit(&FetchEvent::SourceAttempted {
                provider: provider.name(),
            });
            let candidates = provider.provide(&query, &config).await;

            if !self.is_current(generation, &query) {
                return self.cancelled(generation);
            }
            if candidates.is_empty() {
                self.emit(&FetchEvent::SourceEmpty {
                    provider: provider.name(),
                });
                continue;
            }

            for candidate in candidates {
                let label = candidate.label();
                let score = score_candidate(&candidate, &query);
                match self.accept(generation, &query, candidate, score, threshold) {
                    Acceptance::Accepted { index, selected } => {
                        self.emit(&FetchEvent::Accepted {
                            label,
                            score,
                            index,
                            selected,
                        });
                    }
                    Acceptance::Rejected(reason) => {
                        self.emit(&FetchEvent::Rejected {
                            label,
                            score,
                            reason,
                        });
                    }
                    Acceptance::Stale => return self.cancelled(generation),
                }
            }
        }

        let (total, best) = {
            let session = self.session.read();
            if !session.is_current(generation, &query) {
                drop(session);
                return self.cancelled(generation);
            }
            (
                session.results.len(),
                session.selected().map(|r| r.candidate.clone()),
            )
        };
        self.emit(&FetchEvent::Completed {
            total,
            selected: best.as_ref().map(LyricsCandidate::label),
        });

        if let Some(best) = best.filter(|b| b.source != CACHE_SOURCE) {
            match self
                .store
                .save(&query.artist, &query.title, &best.lines, &best.source)
                .await
            {
                Ok(()) => self.emit(&FetchEvent::Saved {
                    label: best.label(),
                }),
                Err(e) => warn!(target: LOG_TARGET, "Failed to save lyrics to cache: {}", e),
            }
        }

        FetchOutcome::Completed { total }
    }

    /// Run one candidate through dedup and threshold checks and append it.
    fn accept(
        &self,
        generation: u64,
        query: &LyricsQuery,
        candidate: LyricsCandidate,
        score: i64,
        threshold: i64,
    ) -> Acceptance {
        if !self.is_current(generation, query) {
            return Acceptance::Stale;
        }

        let fingerprint = fingerprint(&candidate.lines);
        if fingerprint.is_empty() {
            return Acceptance::Rejected(RejectReason::EmptyContent);
        }

        let exempt = candidate.source == CACHE_SOURCE || candidate.source == LOCAL_DB_SOURCE;
        if !exempt && score < threshold {
            return Acceptance::Rejected(RejectReason::BelowThreshold { threshold });
        }

        let mut session = self.session.write();
        if !session.is_current(generation, query) {
            return Acceptance::Stale;
        }
        if session.results.iter().any(|r| r.fingerprint == fingerprint) {
            return Acceptance::Rejected(RejectReason::Duplicate);
        }

        let index = session.results.len();
        let selected = session.selected().map_or(true, |best| score > best.score);
        session.results.push(ScoredCandidate {
            candidate,
            score,
            fingerprint,
        });
        if selected {
            session.selected = index;
        }

        Acceptance::Accepted { index, selected }
    }

    /// Whether `title`/`artist` differ (case-insensitively) from the current song
    #[must_use]
    pub fn needs_new_song(&self, title: &str, artist: &str) -> bool {
        let session = self.session.read();
        session.title.to_lowercase() != title.to_lowercase()
            || session.artist.to_lowercase() != artist.to_lowercase()
    }

    /// Forget the current song so the next [`Self::needs_new_song`] is true.
    ///
    /// An in-flight fetch for the forgotten song is discarded.
    pub fn force_refetch(&self) {
        let mut session = self.session.write();
        session.title.clear();
        session.artist.clear();
        session.results.clear();
        session.selected = 0;
    }

    /// Select the next result, wrapping around
    pub fn next_lyrics(&self) {
        self.cycle(|selected, total| (selected + 1) % total);
    }

    /// Select the previous result, wrapping around
    pub fn previous_lyrics(&self) {
        self.cycle(|selected, total| (selected + total - 1) % total);
    }

    fn cycle(&self, step: impl FnOnce(usize, usize) -> usize) {
        let switched = {
            let mut session = self.session.write();
            let total = session.results.len();
            if total <= 1 {
                return;
            }
            session.selected = step(session.selected, total);
            session.selected().map(|r| FetchEvent::Switched {
                index: session.selected,
                total,
                label: r.candidate.label(),
            })
        };
        if let Some(event) = switched {
            self.emit(&event);
        }
    }

    /// Label of the selected result, or "None"
    #[must_use]
    pub fn current_source_label(&self) -> String {
        self.session
            .read()
            .selected()
            .map_or_else(|| NO_SOURCE_LABEL.to_string(), |r| r.candidate.label())
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.session.read().selected
    }

    #[must_use]
    pub fn total_results(&self) -> usize {
        self.session.read().results.len()
    }

    #[must_use]
    pub fn has_multiple_results(&self) -> bool {
        self.total_results() > 1
    }

    /// Lines of the selected result
    #[must_use]
    pub fn selected_lines(&self) -> Vec<LyricLine> {
        self.session
            .read()
            .selected()
            .map(|r| r.candidate.lines.clone())
            .unwrap_or_default()
    }

    /// Text of the line playing at `position_ms`, empty if none
    #[must_use]
    pub fn current_line(&self, position_ms: u64) -> String {
        let session = self.session.read();
        session
            .selected()
            .and_then(|r| {
                let lines = &r.candidate.lines;
                current_line_index(lines, position_ms).map(|i| lines[i].text.clone())
            })
            .unwrap_or_default()
    }

    /// Current line with the active word highlighted, empty if none
    #[must_use]
    pub fn current_line_word_sync(&self, position_ms: u64) -> String {
        let session = self.session.read();
        session
            .selected()
            .and_then(|r| word_sync_line(&r.candidate.lines, position_ms, &self.marker))
            .unwrap_or_default()
    }

    /// Timestamp of the last line of the selected result, 0 when empty
    #[must_use]
    pub fn song_length(&self) -> u64 {
        self.session
            .read()
            .selected()
            .map_or(0, |r| r.candidate.last_timestamp_ms())
    }

    /// All line texts of the selected result, newline separated
    #[must_use]
    pub fn full_lyrics_text(&self) -> String {
        self.session
            .read()
            .selected()
            .map(|r| {
                r.candidate
                    .lines
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    /// Remove the cached lyrics of a song
    ///
    /// # Errors
    ///
    /// Returns an error if the cache entry cannot be deleted.
    pub async fn clear_cache(&self, title: &str, artist: &str) -> Result<()> {
        self.store.clear(title, artist).await
    }
}
