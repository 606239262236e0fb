use crate::error::{CoreError, Result};
use crate::word_sync::HighlightMarker;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyrisyncConfig {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub word_sync: HighlightMarker,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings forwarded to every provider call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Folder holding the lyrics cache database
    #[serde(default = "default_cache_folder")]
    pub cache_folder: PathBuf,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_days: u32,
    /// Drop lyrics that are mostly Chinese, Japanese or Korean script
    #[serde(default = "default_true")]
    pub filter_cjk_lyrics: bool,
    /// Only query the cache and the local database
    #[serde(default)]
    pub offline_mode: bool,
    /// Estimate timing for plain lyrics when nothing synced is found
    #[serde(default)]
    pub plain_lyrics_fallback: bool,
    /// Optional LRCLIB database dump for offline lookups
    #[serde(default)]
    pub local_database_path: Option<PathBuf>,
}

fn default_cache_folder() -> PathBuf {
    crate::paths::default_cache_dir()
}

const fn default_cache_ttl() -> u32 {
    30
}

const fn default_true() -> bool {
    true
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            cache_folder: default_cache_folder(),
            cache_ttl_days: default_cache_ttl(),
            filter_cjk_lyrics: true,
            offline_mode: false,
            plain_lyrics_fallback: false,
            local_database_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/lyrisync/lyrisync.log
    #[serde(default)]
    pub enabled: bool,
}

impl LyrisyncConfig {
    /// Get the config file path (~/.config/lyrisync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location, writing a template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after creating the template, or an error if the
    /// file cannot be read or parsed.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path`, writing a template there if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after creating the template, or an error if the
    /// file cannot be read or parsed.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        Ok(config)
    }

    /// Parse and validate config from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is invalid.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;

        if config.lyrics.cache_folder.as_os_str().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.cache_folder must not be empty".to_string(),
            });
        }

        Ok(config)
    }
}

const CONFIG_TEMPLATE: &str = r##"# Lyrisync Configuration
# ~/.config/lyrisync/config.toml

[lyrics]
# Folder for the lyrics cache database (defaults to ~/.config/lyrisync/cache)
# cache_folder = ""
cache_ttl_days = 30
# Skip lyrics that are mostly Chinese/Japanese/Korean script
filter_cjk_lyrics = true
# Only use the cache and the local database
offline_mode = false
# Estimate timing from plain lyrics when no synced lyrics exist
plain_lyrics_fallback = false
# Optional LRCLIB database dump for offline lookups
# local_database_path = "db.sqlite3"

[word_sync]
# Markup wrapped around the currently sung word
highlight_open = "<color=yellow>"
highlight_close = "</color>"

[logging]
# Also write logs to ~/.config/lyrisync/lyrisync.log
enabled = false
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = LyrisyncConfig::parse(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.lyrics, LyricsConfig::default());
        assert_eq!(config.word_sync, HighlightMarker::default());
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_partial_config() {
        let config = LyrisyncConfig::parse(
            r#"
[lyrics]
offline_mode = true
local_database_path = "/data/db.sqlite3"
"#,
        )
        .unwrap();
        assert!(config.lyrics.offline_mode);
        assert!(config.lyrics.filter_cjk_lyrics);
        assert_eq!(
            config.lyrics.local_database_path,
            Some(PathBuf::from("/data/db.sqlite3"))
        );
    }

    #[test]
    fn test_empty_cache_folder_rejected() {
        let err = LyrisyncConfig::parse("[lyrics]\ncache_folder = \"\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = LyrisyncConfig::parse("[lyrics\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = LyrisyncConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert!(path.exists());

        let config = LyrisyncConfig::load_or_create_at(&path).unwrap();
        assert!(!config.lyrics.offline_mode);
    }
}
