use async_trait::async_trait;
use lyrisync_core::CoreError;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const LOG_TARGET: &str = "lyrisync::provider::lrclib";

pub const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

const USER_AGENT: &str = concat!(
    "Lyrisync/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/kvnxiao/lyrisync)"
);

/// Track descriptor returned by `/api/search`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LrclibTrack {
    pub id: i64,
    #[serde(rename = "trackName")]
    pub track_name: Option<String>,
    #[serde(rename = "artistName")]
    pub artist_name: Option<String>,
    #[serde(rename = "albumName")]
    pub album_name: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
}

/// Lyrics payload returned by `/api/get/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LrclibLyrics {
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
}

/// The two LRCLIB endpoints used for lookups
#[async_trait]
pub trait LrclibApi: Send + Sync {
    /// Search tracks by name and artist
    async fn search(&self, track_name: &str, artist_name: &str) -> Result<Vec<LrclibTrack>, CoreError>;

    /// Fetch the lyrics of one track
    async fn get(&self, id: i64) -> Result<LrclibLyrics, CoreError>;
}

/// HTTP client for the LRCLIB API
pub struct LrclibClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibClient {
    /// Create a client for lrclib.net with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Create a client against another API root, e.g. a mirror or a mock server
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        // Wrap with retry middleware (exponential backoff)
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
        debug!(target: LOG_TARGET, "LRCLIB GET: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: "lrclib".to_string(),
                reason: format!("LRCLIB returned status: {status}"),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LrclibApi for LrclibClient {
    async fn search(&self, track_name: &str, artist_name: &str) -> Result<Vec<LrclibTrack>, CoreError> {
        let url = format!(
            "{}/search?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        );
        self.get_json(&url).await
    }

    async fn get(&self, id: i64) -> Result<LrclibLyrics, CoreError> {
        let url = format!("{}/get/{id}", self.base_url);
        self.get_json(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> LrclibClient {
        LrclibClient::with_base_url(format!("{}/api/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_track_and_artist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("track_name", "Bohemian Rhapsody"))
            .and(query_param("artist_name", "Queen"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 42,
                    "trackName": "Bohemian Rhapsody",
                    "artistName": "Queen",
                    "albumName": "A Night at the Opera",
                    "duration": 354.0,
                    "instrumental": false,
                    "syncedLyrics": "[00:01.00]Is this the real life?",
                    "plainLyrics": "Is this the real life?"
                },
                { "id": 43, "trackName": null, "artistName": "Queen", "instrumental": true }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let tracks = client_for(&server)
            .await
            .search("Bohemian Rhapsody", "Queen")
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, 42);
        assert_eq!(tracks[0].album_name.as_deref(), Some("A Night at the Opera"));
        assert_eq!(tracks[0].duration, Some(354.0));
        assert!(tracks[1].instrumental);
        assert_eq!(tracks[1].track_name, None);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "syncedLyrics": null,
                "plainLyrics": "Only plain"
            })))
            .mount(&server)
            .await;

        let lyrics = client_for(&server).await.get(42).await.unwrap();
        assert_eq!(lyrics.synced_lyrics, None);
        assert_eq!(lyrics.plain_lyrics.as_deref(), Some("Only plain"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get/7"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get(7).await.unwrap_err();
        assert!(matches!(err, CoreError::LyricsProviderFailed { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .search("a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NetworkError(_)));
    }
}
