use crate::error::Result;
use crate::lrc::{parse_timed_text, serialize_timed_text, LyricLine};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

const LOG_TARGET: &str = "lyrisync::cache";

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS lyrics (
    artist_key TEXT NOT NULL,
    title_key TEXT NOT NULL,
    artist TEXT NOT NULL,
    title TEXT NOT NULL,
    source TEXT NOT NULL,
    content TEXT NOT NULL,
    fetched_at INTEGER NOT NULL,
    PRIMARY KEY (artist_key, title_key)
);

CREATE INDEX IF NOT EXISTS idx_lyrics_fetched_at ON lyrics(fetched_at);
";

/// Persistent storage for the best lyrics of each song.
///
/// Keys are (artist, title) compared case-insensitively after trimming.
#[async_trait]
pub trait LyricsStore: Send + Sync {
    /// Load previously saved lines, `None` on a miss
    async fn try_load(&self, artist: &str, title: &str) -> Result<Option<Vec<LyricLine>>>;

    /// Save lines, replacing any existing entry
    async fn save(&self, artist: &str, title: &str, lines: &[LyricLine], source: &str)
        -> Result<()>;

    /// Remove the entry for a song, if any
    async fn clear(&self, title: &str, artist: &str) -> Result<()>;
}

fn cache_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// SQLite-based lyrics cache
pub struct LyricsCache {
    conn: Connection,
}

impl LyricsCache {
    /// Open the cache database inside `folder`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the cache database cannot be created or opened.
    pub async fn open_in(folder: &Path) -> Result<Self> {
        Self::open(&folder.join(crate::paths::LYRICS_CACHE_DB_FILE_NAME)).await
    }

    /// Open a cache at a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!(target: LOG_TARGET, "Opening lyrics cache database at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Delete cache entries older than `ttl_days`
    ///
    /// # Errors
    ///
    /// Returns an error if the database cleanup fails.
    pub async fn cleanup(&self, ttl_days: u32) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - (i64::from(ttl_days) * 24 * 60 * 60);

        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM lyrics WHERE fetched_at < ?1",
                    rusqlite::params![cutoff],
                )?;
                Ok(deleted)
            })
            .await?;

        if deleted > 0 {
            info!(target: LOG_TARGET, "Removed {} expired cache entries", deleted);
        }
        Ok(deleted)
    }

    /// Checkpoint WAL for clean shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL checkpoint fails.
    pub async fn checkpoint(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }

    /// Backdate an entry; lets tests exercise expiry
    #[cfg(test)]
    async fn set_fetched_at(&self, artist: &str, title: &str, fetched_at: i64) -> Result<()> {
        let (artist_key, title_key) = (cache_key(artist), cache_key(title));
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE lyrics SET fetched_at = ?1 WHERE artist_key = ?2 AND title_key = ?3",
                    rusqlite::params![fetched_at, artist_key, title_key],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl LyricsStore for LyricsCache {
    async fn try_load(&self, artist: &str, title: &str) -> Result<Option<Vec<LyricLine>>> {
        debug!(target: LOG_TARGET, "Looking up lyrics in cache: {} - {}", artist, title);
        let (artist_key, title_key) = (cache_key(artist), cache_key(title));

        let content = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT content FROM lyrics WHERE artist_key = ?1 AND title_key = ?2",
                )?;
                let content = stmt
                    .query_row(rusqlite::params![artist_key, title_key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;
                Ok(content)
            })
            .await?;

        Ok(content
            .map(|c| parse_timed_text(&c))
            .filter(|lines| !lines.is_empty()))
    }

    async fn save(
        &self,
        artist: &str,
        title: &str,
        lines: &[LyricLine],
        source: &str,
    ) -> Result<()> {
        info!(
            target: LOG_TARGET,
            "Storing lyrics in cache: {} - {} (source: {})", artist, title, source
        );
        let (artist_key, title_key) = (cache_key(artist), cache_key(title));
        let artist = artist.trim().to_string();
        let title = title.trim().to_string();
        let source = source.to_string();
        let content = serialize_timed_text(lines);
        let now = Utc::now().timestamp();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r"
                    INSERT INTO lyrics (artist_key, title_key, artist, title, source, content, fetched_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(artist_key, title_key) DO UPDATE SET
                        artist = excluded.artist,
                        title = excluded.title,
                        source = excluded.source,
                        content = excluded.content,
                        fetched_at = excluded.fetched_at
                ",
                    rusqlite::params![artist_key, title_key, artist, title, source, content, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }

    async fn clear(&self, title: &str, artist: &str) -> Result<()> {
        info!(target: LOG_TARGET, "Clearing cached lyrics: {} - {}", artist, title);
        let (artist_key, title_key) = (cache_key(artist), cache_key(title));

        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM lyrics WHERE artist_key = ?1 AND title_key = ?2",
                    rusqlite::params![artist_key, title_key],
                )?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}
