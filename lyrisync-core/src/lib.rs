pub mod cache;
pub mod cjk;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod fingerprint;
pub mod lrc;
pub mod paths;
pub mod plain;
pub mod provider;
pub mod providers;
pub mod score;
pub mod word_sync;

pub use cache::{LyricsCache, LyricsStore};
pub use config::{LoggingConfig, LyricsConfig, LyrisyncConfig};
pub use error::{CoreError, Result};
pub use events::{FetchEvent, FetchObserver, RejectReason, TracingObserver};
pub use fetcher::{FetchOutcome, LyricsFetcher, NO_SOURCE_LABEL};
pub use lrc::{parse_timed_text, LyricLine};
pub use paths::{
    config_dir, default_cache_dir, log_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LYRICS_CACHE_DB_FILE_NAME,
};
pub use provider::{
    LyricsCandidate, LyricsProvider, LyricsQuery, SourceTier, CACHE_SOURCE, LOCAL_DB_SOURCE,
};
pub use providers::{CacheProvider, LocalDatabaseProvider};
pub use word_sync::HighlightMarker;
