mod cli;
mod time;

use crate::cli::{Cli, Command, PlayArgs, QueryArgs};
use crate::time::{format_position, DurationExt};
use clap::Parser;
use lyrisync_core::{
    CacheProvider, CoreError, FetchOutcome, LocalDatabaseProvider, LyricsCache, LyricsConfig,
    LyricsFetcher, LyricsProvider, LyricsStore, LyrisyncConfig,
};
use lyrisync_lyrics_lrclib::{LrclibApi, LrclibClient, LrclibProvider};
use lyrisync_lyrics_netease::{NeteaseClient, NeteaseProvider};
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Playback clock resolution
const TICK_MS: u64 = 50;
/// Keep following the clock this long past the last line
const END_GRACE_MS: u64 = 5000;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(LyrisyncConfig::config_path);

    // Check config for logging.enabled before full config load
    init_tracing(check_file_logging_enabled(&config_path));

    let mut config = match LyrisyncConfig::load_or_create_at(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}, continuing with defaults",
                path.display()
            );
            LyrisyncConfig::default()
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config.lyrics);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli.command, config))
}

async fn run(command: Command, config: LyrisyncConfig) -> ExitCode {
    let LyrisyncConfig {
        lyrics, word_sync, ..
    } = config;

    let cache = match LyricsCache::open_in(&lyrics.cache_folder).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("Failed to initialize lyrics cache: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = cache.cleanup(lyrics.cache_ttl_days).await {
        warn!("Cache cleanup failed: {}", e);
    }

    let providers = create_providers(&lyrics, Arc::clone(&cache)).await;
    let provider_names: Vec<_> = providers.iter().map(|p| p.name()).collect();
    info!(
        "Initialized {} lyrics provider(s): {:?}",
        providers.len(),
        provider_names
    );

    let fetcher = Arc::new(
        LyricsFetcher::new(
            providers,
            Arc::clone(&cache) as Arc<dyn LyricsStore>,
            lyrics,
        )
        .with_highlight_marker(word_sync),
    );

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let code = match command {
        Command::Fetch { query, alternate } => fetch_once(&fetcher, &query, alternate).await,
        Command::Play(args) => {
            play(&fetcher, &args, &cancel_token).await;
            ExitCode::SUCCESS
        }
        Command::ClearCache { title, artist } => match fetcher.clear_cache(&title, &artist).await
        {
            Ok(()) => {
                println!("Cleared cached lyrics for {artist} - {title}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to clear cache: {}", e);
                ExitCode::FAILURE
            }
        },
    };

    if let Err(e) = cache.checkpoint().await {
        warn!("Cache checkpoint failed: {}", e);
    }
    code
}

/// Build the provider chain from config; the fetcher orders it by tier
async fn create_providers(
    config: &LyricsConfig,
    cache: Arc<LyricsCache>,
) -> Vec<Box<dyn LyricsProvider>> {
    let mut providers: Vec<Box<dyn LyricsProvider>> = vec![Box::new(CacheProvider::new(cache))];

    if let Some(path) = &config.local_database_path {
        let local_db = LocalDatabaseProvider::open(path).await;
        if config.offline_mode && !local_db.is_available() {
            warn!("Offline mode enabled but local database not found!");
        }
        providers.push(Box::new(local_db));
    } else if config.offline_mode {
        warn!("Offline mode enabled without a local database; only cached lyrics are available");
    }

    match LrclibClient::new() {
        Ok(client) => {
            let client: Arc<dyn LrclibApi> = Arc::new(client);
            providers.push(Box::new(LrclibProvider::synced(Arc::clone(&client))));
            providers.push(Box::new(LrclibProvider::plain(client)));
        }
        Err(e) => error!("Failed to create LRCLIB client: {}", e),
    }

    match NeteaseClient::new() {
        Ok(client) => providers.push(Box::new(NeteaseProvider::new(Arc::new(client)))),
        Err(e) => error!("Failed to create NetEase client: {}", e),
    }

    providers
}

async fn fetch_once(fetcher: &LyricsFetcher, query: &QueryArgs, alternate: usize) -> ExitCode {
    let outcome = fetcher
        .fetch(&query.title, &query.artist, query.duration_ms, query.low_trust)
        .await;
    if outcome == FetchOutcome::Cancelled || fetcher.total_results() == 0 {
        println!("No lyrics found for {} - {}", query.artist, query.title);
        return ExitCode::FAILURE;
    }

    for _ in 0..alternate {
        fetcher.next_lyrics();
    }

    println!(
        "Source: {} ({}/{})",
        fetcher.current_source_label(),
        fetcher.current_index() + 1,
        fetcher.total_results()
    );
    println!();
    println!("{}", fetcher.full_lyrics_text());
    ExitCode::SUCCESS
}

/// Fetch in the background while a simulated clock prints the current line
async fn play(fetcher: &Arc<LyricsFetcher>, args: &PlayArgs, cancel_token: &CancellationToken) {
    let fetch_task = {
        let fetcher = Arc::clone(fetcher);
        let query = args.query.clone();
        tokio::spawn(async move {
            fetcher
                .fetch(&query.title, &query.artist, query.duration_ms, query.low_trust)
                .await
        })
    };

    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));
    let mut fetch_done = false;
    let mut last_text = String::new();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let position = args.start_ms + started.elapsed().as_millis_u64();

        if !fetch_done && fetch_task.is_finished() {
            fetch_done = true;
            if fetcher.total_results() == 0 {
                println!("No lyrics found for {} - {}", args.query.artist, args.query.title);
                break;
            }
            println!(
                "Source: {} ({}/{})",
                fetcher.current_source_label(),
                fetcher.current_index() + 1,
                fetcher.total_results()
            );
        }

        let text = current_text(fetcher, position, args.word_sync);
        if text != last_text {
            if !text.is_empty() {
                println!("[{}] {}", format_position(position), text);
            }
            last_text = text;
        }

        let end = args.query.duration_ms.max(fetcher.song_length()) + END_GRACE_MS;
        if fetch_done && position > end {
            break;
        }
    }

    fetch_task.abort();
}

fn current_text(fetcher: &LyricsFetcher, position_ms: u64, word_sync: bool) -> String {
    if word_sync {
        let highlighted = fetcher.current_line_word_sync(position_ms);
        if !highlighted.is_empty() {
            return highlighted;
        }
    }
    fetcher.current_line(position_ms)
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lyrisync_core::log_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
