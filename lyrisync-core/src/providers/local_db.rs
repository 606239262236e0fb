use crate::cjk::passes_cjk_filter;
use crate::config::LyricsConfig;
use crate::error::{CoreError, Result};
use crate::lrc::parse_timed_text;
use crate::provider::{
    LyricsCandidate, LyricsProvider, LyricsQuery, SourceTier, LOCAL_DB_SOURCE,
};
use async_trait::async_trait;
use rusqlite::OpenFlags;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyrisync::provider::localdb";

/// Maximum number of rows returned per lookup
const MAX_RESULTS: usize = 10;

// Latest non-instrumental synced lyrics for tracks matching name and artist,
// closest duration first when a duration is known.
const LOOKUP_SQL: &str = r"
SELECT t.name, t.artist_name, t.album_name, l.synced_lyrics
FROM tracks t
INNER JOIN lyrics l ON l.id = t.last_lyrics_id
WHERE t.name_lower = ?1
  AND t.artist_name_lower = ?2
  AND l.instrumental = 0
  AND l.synced_lyrics IS NOT NULL
  AND TRIM(l.synced_lyrics) <> ''
ORDER BY CASE WHEN ?3 > 0 THEN ABS(t.duration - ?3) ELSE 0 END, t.id
LIMIT ?4
";

struct TrackRow {
    name: String,
    artist_name: String,
    album_name: Option<String>,
    synced_lyrics: String,
}

/// Offline lookups in an LRCLIB database dump
pub struct LocalDatabaseProvider {
    conn: Option<Connection>,
}

impl LocalDatabaseProvider {
    /// Open the database read-only. A missing or unreadable file leaves the
    /// provider unavailable instead of failing.
    pub async fn open(path: &Path) -> Self {
        match Self::try_open(path).await {
            Ok(conn) => {
                info!(target: LOG_TARGET, "Local lyrics database loaded from {:?}", path);
                Self { conn: Some(conn) }
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Local lyrics database unavailable: {}", e);
                Self { conn: None }
            }
        }
    }

    async fn try_open(path: &Path) -> Result<Connection> {
        if !path.is_file() {
            return Err(CoreError::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).await?;

        // Fail early on files that are not an LRCLIB dump
        conn.call(|conn| {
            conn.prepare("SELECT id, last_lyrics_id FROM tracks LIMIT 1")?;
            Ok(())
        })
        .await?;

        Ok(conn)
    }

    async fn lookup(conn: &Connection, query: &LyricsQuery) -> Result<Vec<TrackRow>> {
        let title = query.title.trim().to_lowercase();
        let artist = query.artist.trim().to_lowercase();
        #[allow(clippy::cast_precision_loss)]
        let duration_secs = query.duration_ms as f64 / 1000.0;
        let limit = i64::try_from(MAX_RESULTS).unwrap_or(i64::MAX);

        let rows = conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(LOOKUP_SQL)?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![title, artist, duration_secs, limit],
                        |row| {
                            Ok(TrackRow {
                                name: row.get(0)?,
                                artist_name: row.get(1)?,
                                album_name: row.get(2)?,
                                synced_lyrics: row.get(3)?,
                            })
                        },
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(rows)
    }
}

#[async_trait]
impl LyricsProvider for LocalDatabaseProvider {
    fn name(&self) -> &'static str {
        LOCAL_DB_SOURCE
    }

    fn tier(&self) -> SourceTier {
        SourceTier::LocalDatabase
    }

    fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    async fn provide(&self, query: &LyricsQuery, config: &LyricsConfig) -> Vec<LyricsCandidate> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };

        let rows = match Self::lookup(conn, query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(target: LOG_TARGET, "Local database lookup failed: {}", e);
                return Vec::new();
            }
        };
        debug!(
            target: LOG_TARGET,
            "Local database returned {} rows for {} - {}",
            rows.len(),
            query.artist,
            query.title
        );

        rows.into_iter()
            .filter(|row| passes_cjk_filter(&row.synced_lyrics, config.filter_cjk_lyrics))
            .filter_map(|row| {
                let lines = parse_timed_text(&row.synced_lyrics);
                if lines.is_empty() {
                    return None;
                }
                Some(
                    LyricsCandidate::synced(LOCAL_DB_SOURCE, lines, row.name, row.artist_name)
                        .with_album(row.album_name.unwrap_or_default()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TEST_SCHEMA: &str = r"
CREATE TABLE tracks (
    id INTEGER PRIMARY KEY,
    name TEXT,
    name_lower TEXT,
    artist_name TEXT,
    artist_name_lower TEXT,
    album_name TEXT,
    duration REAL,
    last_lyrics_id INTEGER
);
CREATE TABLE lyrics (
    id INTEGER PRIMARY KEY,
    plain_lyrics TEXT,
    synced_lyrics TEXT,
    track_id INTEGER,
    instrumental BOOLEAN NOT NULL DEFAULT 0
);
";

    fn insert_track(
        conn: &rusqlite::Connection,
        id: i64,
        name: &str,
        artist: &str,
        duration: f64,
        synced: Option<&str>,
        instrumental: bool,
    ) {
        conn.execute(
            "INSERT INTO lyrics (id, synced_lyrics, track_id, instrumental) VALUES (?1, ?2, ?1, ?3)",
            rusqlite::params![id, synced, instrumental],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tracks (id, name, name_lower, artist_name, artist_name_lower, album_name, duration, last_lyrics_id)
             VALUES (?1, ?2, ?3, ?4, ?5, 'Album', ?6, ?1)",
            rusqlite::params![id, name, name.to_lowercase(), artist, artist.to_lowercase(), duration],
        )
        .unwrap();
    }

    fn build_db(dir: &Path) -> PathBuf {
        let path = dir.join("db.sqlite3");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(TEST_SCHEMA).unwrap();
        insert_track(&conn, 1, "Song", "Artist", 240.0, Some("[00:01.00]far version"), false);
        insert_track(&conn, 2, "Song", "Artist", 181.0, Some("[00:01.00]close version"), false);
        insert_track(&conn, 3, "Song", "Artist", 180.0, None, false);
        insert_track(&conn, 4, "Song", "Artist", 180.0, Some("[00:01.00]la la"), true);
        insert_track(&conn, 5, "Song", "Artist", 180.0, Some("[00:01.00]你好世界"), false);
        insert_track(&conn, 6, "Other", "Artist", 180.0, Some("[00:01.00]other"), false);
        path
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDatabaseProvider::open(&dir.path().join("missing.sqlite3")).await;

        assert!(!provider.is_available());
        let query = LyricsQuery::new("Song", "Artist");
        assert!(provider
            .provide(&query, &LyricsConfig::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_lookup_orders_by_duration_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDatabaseProvider::open(&build_db(dir.path())).await;
        assert!(provider.is_available());

        let query = LyricsQuery::new(" SONG ", "artist").with_duration_ms(180_000);
        let candidates = provider.provide(&query, &LyricsConfig::default()).await;

        let texts: Vec<_> = candidates.iter().map(|c| c.lines[0].text.as_str()).collect();
        assert_eq!(texts, vec!["close version", "far version"]);
        assert!(candidates.iter().all(|c| c.source == "localdb"));
        assert_eq!(candidates[0].album, "Album");
    }

    #[tokio::test]
    async fn test_cjk_filter_disabled_keeps_cjk_rows() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDatabaseProvider::open(&build_db(dir.path())).await;

        let config = LyricsConfig {
            filter_cjk_lyrics: false,
            ..LyricsConfig::default()
        };
        let query = LyricsQuery::new("Song", "Artist").with_duration_ms(180_000);
        let candidates = provider.provide(&query, &config).await;

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].lines[0].text, "你好世界");
    }
}
