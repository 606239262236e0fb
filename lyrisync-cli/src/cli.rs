use clap::{Args, Parser, Subcommand};
use lyrisync_core::LyricsConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lyrisync", version, about = "Synchronized lyrics from multiple sources")]
pub struct Cli {
    /// Config file (defaults to ~/.config/lyrisync/config.toml)
    #[arg(long, global = true, env = "LYRISYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only use the cache and the local database
    #[arg(long, global = true)]
    pub offline: bool,

    /// Keep lyrics that are mostly CJK script
    #[arg(long, global = true)]
    pub no_cjk_filter: bool,

    /// Estimate timing from plain lyrics when nothing synced is found
    #[arg(long, global = true)]
    pub plain_fallback: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config
    pub fn apply_overrides(&self, config: &mut LyricsConfig) {
        if self.offline {
            config.offline_mode = true;
        }
        if self.no_cjk_filter {
            config.filter_cjk_lyrics = false;
        }
        if self.plain_fallback {
            config.plain_lyrics_fallback = true;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch lyrics once and print them
    Fetch {
        #[command(flatten)]
        query: QueryArgs,

        /// Show the Nth alternate instead of the best match
        #[arg(long, default_value_t = 0)]
        alternate: usize,
    },
    /// Fetch lyrics and follow a simulated playback clock
    Play(PlayArgs),
    /// Remove the cached lyrics of a song
    ClearCache {
        #[arg(long)]
        title: String,

        #[arg(long)]
        artist: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub artist: String,

    /// Track length in milliseconds, improves matching
    #[arg(long, default_value_t = 0)]
    pub duration_ms: u64,

    /// Title comes from noisy metadata (e.g. a browser tab)
    #[arg(long)]
    pub low_trust: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PlayArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Playback position to start from
    #[arg(long, default_value_t = 0)]
    pub start_ms: u64,

    /// Highlight the current word
    #[arg(long)]
    pub word_sync: bool,
}
