use crate::cache::LyricsStore;
use crate::config::LyricsConfig;
use crate::provider::{LyricsCandidate, LyricsProvider, LyricsQuery, SourceTier, CACHE_SOURCE};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const LOG_TARGET: &str = "lyrisync::provider::cache";

/// Serves previously saved lyrics from a [`LyricsStore`]
pub struct CacheProvider {
    store: Arc<dyn LyricsStore>,
}

impl CacheProvider {
    pub fn new(store: Arc<dyn LyricsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LyricsProvider for CacheProvider {
    fn name(&self) -> &'static str {
        CACHE_SOURCE
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Cache
    }

    async fn provide(&self, query: &LyricsQuery, _config: &LyricsConfig) -> Vec<LyricsCandidate> {
        match self.store.try_load(&query.artist, &query.title).await {
            Ok(Some(lines)) => {
                debug!(target: LOG_TARGET, "Cache hit: {} - {}", query.artist, query.title);
                vec![LyricsCandidate::synced(
                    CACHE_SOURCE,
                    lines,
                    &query.title,
                    &query.artist,
                )]
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(target: LOG_TARGET, "Cache lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}
