use async_trait::async_trait;
use lyrisync_core::CoreError;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

const LOG_TARGET: &str = "lyrisync::provider::netease";

pub const NETEASE_API_URL: &str = "https://music.163.com/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

const NETEASE_REFERER: &str = "https://music.163.com";
const NETEASE_COOKIE: &str = "appver=2.0.2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NeteaseArtist {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NeteaseAlbum {
    #[serde(default)]
    pub name: String,
}

/// Best match returned by the song search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NeteaseSong {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<NeteaseArtist>,
    pub album: Option<NeteaseAlbum>,
}

impl NeteaseSong {
    /// Artist names joined with ", "
    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Vec<NeteaseSong>,
}

#[derive(Debug, Deserialize)]
struct LyricResponse {
    lrc: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
struct LyricBody {
    lyric: Option<String>,
}

/// The two NetEase endpoints used for lookups
#[async_trait]
pub trait NeteaseApi: Send + Sync {
    /// Best matching song for a free-text query
    async fn search(&self, query: &str) -> Result<Option<NeteaseSong>, CoreError>;

    /// Timed lyrics of a song, already decoded
    async fn lyric(&self, id: i64) -> Result<Option<String>, CoreError>;
}

/// HTTP client for the NetEase Cloud Music web API
pub struct NeteaseClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NeteaseClient {
    /// Create a client for music.163.com with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(NETEASE_API_URL)
    }

    /// Create a client against another API root, e.g. a mock server
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(NETEASE_REFERER));
        headers.insert(COOKIE, HeaderValue::from_static(NETEASE_COOKIE));

        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CoreError> {
        debug!(target: LOG_TARGET, "NetEase GET: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: "netease".to_string(),
                reason: format!("NetEase returned status: {status}"),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NeteaseApi for NeteaseClient {
    async fn search(&self, query: &str) -> Result<Option<NeteaseSong>, CoreError> {
        let url = format!(
            "{}/search/get?s={}&type=1&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&url).await?;

        Ok(response
            .result
            .and_then(|r| r.songs.into_iter().next()))
    }

    async fn lyric(&self, id: i64) -> Result<Option<String>, CoreError> {
        let url = format!(
            "{}/song/lyric?os=pc&id={id}&lv=-1&kv=-1&tv=-1",
            self.base_url
        );
        let response: LyricResponse = self.get_json(&url).await?;

        Ok(response
            .lrc
            .and_then(|l| l.lyric)
            .map(|raw| decode_lyric(&raw)))
    }
}

/// Undo HTML entities and escaped newlines left in NetEase lyric payloads
fn decode_lyric(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .split('\n')
        .map(decode_entities)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode one line; a line with an unknown entity is left as-is
fn decode_entities(line: &str) -> Cow<'_, str> {
    unescape_with(line, resolve_html5_entity).unwrap_or_else(|e| {
        debug!(target: LOG_TARGET, "Leaving lyric entities as-is: {}", e);
        Cow::Borrowed(line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> NeteaseClient {
        NeteaseClient::with_base_url(format!("{}/api", server.uri())).unwrap()
    }

    #[test]
    fn test_decode_lyric() {
        assert_eq!(
            decode_lyric("[00:01.00]Rock &amp; Roll\\n[00:02.00]It&apos;s &#34;fine&#34;"),
            "[00:01.00]Rock & Roll\n[00:02.00]It's \"fine\""
        );
        assert_eq!(
            decode_lyric("[00:01.00]Rock &amp; Roll&nbsp;baby"),
            "[00:01.00]Rock & Roll\u{a0}baby"
        );
        // An unknown entity only keeps its own line raw
        assert_eq!(
            decode_lyric("[00:01.00]caf&eacute;\\n[00:02.00]a &bogus; b\\n[00:03.00]x &lt; y"),
            "[00:01.00]caf\u{e9}\n[00:02.00]a &bogus; b\n[00:03.00]x < y"
        );
    }

    #[tokio::test]
    async fn test_search_sends_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/get"))
            .and(query_param("s", "Song-Artist"))
            .and(query_param("type", "1"))
            .and(query_param("limit", "1"))
            .and(header("referer", "https://music.163.com"))
            .and(header("cookie", "appver=2.0.2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "songs": [{
                        "id": 1234,
                        "name": "Song",
                        "artists": [{ "name": "Artist" }, { "name": "Guest" }],
                        "album": { "name": "Album" }
                    }],
                    "songCount": 1
                },
                "code": 200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let song = client_for(&server)
            .await
            .search("Song-Artist")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(song.id, 1234);
        assert_eq!(song.artist_names(), "Artist, Guest");
        assert_eq!(song.album.map(|a| a.name).as_deref(), Some("Album"));
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {}, "code": 200 })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).await.search("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lyric_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/song/lyric"))
            .and(query_param("id", "1234"))
            .and(query_param("os", "pc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lrc": { "version": 3, "lyric": "[00:01.00]Tom &amp; Jerry\n[00:03.50]Next" },
                "code": 200
            })))
            .mount(&server)
            .await;

        let lyric = client_for(&server).await.lyric(1234).await.unwrap();
        assert_eq!(
            lyric.as_deref(),
            Some("[00:01.00]Tom & Jerry\n[00:03.50]Next")
        );
    }

    #[tokio::test]
    async fn test_lyric_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/song/lyric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nolyric": true, "code": 200 })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).await.lyric(1).await.unwrap(), None);
    }
}
