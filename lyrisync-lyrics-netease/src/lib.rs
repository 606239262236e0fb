mod client;

pub use client::{NeteaseAlbum, NeteaseApi, NeteaseArtist, NeteaseClient, NeteaseSong, NETEASE_API_URL};

use async_trait::async_trait;
use lyrisync_core::cjk::passes_cjk_filter;
use lyrisync_core::{
    parse_timed_text, LyricsCandidate, LyricsConfig, LyricsProvider, LyricsQuery, SourceTier,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyrisync::provider::netease";
const SOURCE: &str = "netease";

/// Boilerplate NetEase serves in place of lyrics
const NOT_FOUND_PHRASES: &[&str] = &[
    "纯音乐，请欣赏",
    "此歌曲为没有填词的纯音乐",
    "暂时没有歌词",
    "没有找到歌词",
    "未找到歌词",
    "暂无歌词",
];

fn is_placeholder(text: &str) -> bool {
    NOT_FOUND_PHRASES.iter().any(|p| text.contains(p))
}

/// NetEase Cloud Music lyrics provider
pub struct NeteaseProvider {
    api: Arc<dyn NeteaseApi>,
}

impl NeteaseProvider {
    pub fn new(api: Arc<dyn NeteaseApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LyricsProvider for NeteaseProvider {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn tier(&self) -> SourceTier {
        SourceTier::RemoteAlternate
    }

    async fn provide(&self, query: &LyricsQuery, config: &LyricsConfig) -> Vec<LyricsCandidate> {
        let search = format!("{}-{}", query.title, query.artist);
        info!(target: LOG_TARGET, "Searching NetEase for: \"{}\"", search);

        let song = match self.api.search(&search).await {
            Ok(Some(song)) => song,
            Ok(None) => {
                debug!(target: LOG_TARGET, "NetEase: no results");
                return Vec::new();
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "NetEase search failed: {}", e);
                return Vec::new();
            }
        };

        let text = match self.api.lyric(song.id).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(target: LOG_TARGET, "NetEase: no lyrics for id={}", song.id);
                return Vec::new();
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "NetEase lyric request failed (id: {}): {}", song.id, e);
                return Vec::new();
            }
        };

        if !passes_cjk_filter(&text, config.filter_cjk_lyrics) {
            debug!(target: LOG_TARGET, "NetEase: filtered (CJK)");
            return Vec::new();
        }

        let mut lines = parse_timed_text(&text);
        lines.retain(|l| !is_placeholder(&l.text));
        debug!(target: LOG_TARGET, "NetEase: got {} lines", lines.len());
        if lines.is_empty() {
            return Vec::new();
        }

        let title = if song.name.is_empty() {
            query.title.clone()
        } else {
            song.name.clone()
        };
        let artist = Some(song.artist_names())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| query.artist.clone());
        let album = song.album.map(|a| a.name).unwrap_or_default();

        vec![LyricsCandidate::synced(SOURCE, lines, title, artist).with_album(album)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyrisync_core::CoreError;
    use std::sync::Mutex;

    struct FakeApi {
        song: Option<NeteaseSong>,
        lyric: Result<Option<String>, String>,
        searched: Mutex<Option<String>>,
    }

    #[async_trait]
    impl NeteaseApi for FakeApi {
        async fn search(&self, query: &str) -> Result<Option<NeteaseSong>, CoreError> {
            *self.searched.lock().unwrap() = Some(query.to_string());
            Ok(self.song.clone())
        }

        async fn lyric(&self, _id: i64) -> Result<Option<String>, CoreError> {
            self.lyric
                .clone()
                .map_err(|reason| CoreError::LyricsProviderFailed {
                    provider: "netease".to_string(),
                    reason,
                })
        }
    }

    fn song() -> NeteaseSong {
        NeteaseSong {
            id: 7,
            name: "Matched Song".to_string(),
            artists: vec![NeteaseArtist {
                name: "Matched Artist".to_string(),
            }],
            album: Some(NeteaseAlbum {
                name: "Matched Album".to_string(),
            }),
        }
    }

    fn build_provider(
        song: Option<NeteaseSong>,
        lyric: Result<Option<String>, String>,
    ) -> (NeteaseProvider, Arc<FakeApi>) {
        let api = Arc::new(FakeApi {
            song,
            lyric,
            searched: Mutex::new(None),
        });
        (NeteaseProvider::new(Arc::clone(&api) as Arc<dyn NeteaseApi>), api)
    }

    #[tokio::test]
    async fn test_candidate_uses_matched_song() {
        let (provider, api) = build_provider(
            Some(song()),
            Ok(Some("[00:01.00]first\n[00:04.00]second".to_string())),
        );
        let query = LyricsQuery::new("Song", "Artist");
        let candidates = provider.provide(&query, &LyricsConfig::default()).await;

        assert_eq!(api.searched.lock().unwrap().as_deref(), Some("Song-Artist"));
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.source, "netease");
        assert_eq!(c.title, "Matched Song");
        assert_eq!(c.artist, "Matched Artist");
        assert_eq!(c.album, "Matched Album");
        assert_eq!(c.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_placeholder_lines_dropped() {
        let (provider, _) = build_provider(
            Some(song()),
            Ok(Some("[00:00.00]纯音乐，请欣赏".to_string())),
        );
        let config = LyricsConfig {
            filter_cjk_lyrics: false,
            ..LyricsConfig::default()
        };
        assert!(provider
            .provide(&LyricsQuery::new("Song", "Artist"), &config)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_cjk_filter() {
        let lyric = "[00:01.00]我爱你\n[00:03.00]你爱我".to_string();
        let (provider, _) = build_provider(Some(song()), Ok(Some(lyric)));
        let query = LyricsQuery::new("Song", "Artist");

        assert!(provider
            .provide(&query, &LyricsConfig::default())
            .await
            .is_empty());

        let config = LyricsConfig {
            filter_cjk_lyrics: false,
            ..LyricsConfig::default()
        };
        assert_eq!(provider.provide(&query, &config).await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_song_or_lyric_is_empty() {
        let query = LyricsQuery::new("Song", "Artist");

        let (no_song, _) = build_provider(None, Ok(Some("[00:01.00]x".to_string())));
        assert!(no_song.provide(&query, &LyricsConfig::default()).await.is_empty());

        let (no_lyric, _) = build_provider(Some(song()), Ok(None));
        assert!(no_lyric.provide(&query, &LyricsConfig::default()).await.is_empty());

        let (failing, _) = build_provider(Some(song()), Err("timeout".to_string()));
        assert!(failing.provide(&query, &LyricsConfig::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_query_metadata() {
        let bare = NeteaseSong {
            id: 1,
            name: String::new(),
            artists: vec![],
            album: None,
        };
        let (provider, _) = build_provider(Some(bare), Ok(Some("[00:01.00]line".to_string())));
        let candidates = provider
            .provide(&LyricsQuery::new("Song", "Artist"), &LyricsConfig::default())
            .await;

        assert_eq!(candidates[0].title, "Song");
        assert_eq!(candidates[0].artist, "Artist");
        assert_eq!(candidates[0].album, "");
    }
}
