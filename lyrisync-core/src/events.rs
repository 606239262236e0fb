//! Progress notifications emitted by the lyrics fetcher.

use tracing::{debug, info};

const LOG_TARGET: &str = "lyrisync::fetcher";

/// Why a candidate was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No non-blank line to fingerprint
    EmptyContent,
    /// Remote candidate scored under the acceptance threshold
    BelowThreshold { threshold: i64 },
    /// Same content as an already accepted candidate
    Duplicate,
}

/// Events emitted during a fetch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A new fetch started
    Started {
        title: String,
        artist: String,
        generation: u64,
    },
    /// A provider is about to be queried
    SourceAttempted { provider: &'static str },
    /// A provider returned nothing usable
    SourceEmpty { provider: &'static str },
    /// A provider was not queried (offline, unavailable, or disabled)
    SourceSkipped {
        provider: &'static str,
        reason: &'static str,
    },
    /// A candidate was added to the results
    Accepted {
        label: String,
        score: i64,
        index: usize,
        selected: bool,
    },
    /// A candidate was dropped
    Rejected {
        label: String,
        score: i64,
        reason: RejectReason,
    },
    /// A newer fetch superseded this one
    Cancelled { generation: u64 },
    /// The fetch pass finished
    Completed {
        total: usize,
        selected: Option<String>,
    },
    /// The selected candidate was written to the cache
    Saved { label: String },
    /// The user switched to another result
    Switched {
        index: usize,
        total: usize,
        label: String,
    },
}

/// Receives fetch progress notifications
pub trait FetchObserver: Send + Sync {
    fn on_event(&self, event: &FetchEvent);
}

impl<F> FetchObserver for F
where
    F: Fn(&FetchEvent) + Send + Sync,
{
    fn on_event(&self, event: &FetchEvent) {
        self(event);
    }
}

/// Forwards fetch events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent) {
        match event {
            FetchEvent::Started {
                title,
                artist,
                generation,
            } => {
                info!(target: LOG_TARGET, "Fetching lyrics for: {} - {} (generation {})", artist, title, generation);
            }
            FetchEvent::SourceAttempted { provider } => {
                debug!(target: LOG_TARGET, "Trying: {}", provider);
            }
            FetchEvent::SourceEmpty { provider } => {
                debug!(target: LOG_TARGET, "{} found nothing", provider);
            }
            FetchEvent::SourceSkipped { provider, reason } => {
                debug!(target: LOG_TARGET, "Skipping {}: {}", provider, reason);
            }
            FetchEvent::Accepted {
                label,
                score,
                index,
                selected,
            } => {
                info!(
                    target: LOG_TARGET,
                    "Accepted {} as result #{} (score {}{})",
                    label,
                    index + 1,
                    score,
                    if *selected { ", selected" } else { "" }
                );
            }
            FetchEvent::Rejected {
                label,
                score,
                reason,
            } => match reason {
                RejectReason::EmptyContent => {
                    debug!(target: LOG_TARGET, "Rejected {}: no lyric lines", label);
                }
                RejectReason::BelowThreshold { threshold } => {
                    debug!(target: LOG_TARGET, "Rejected {}: score {} < {}", label, score, threshold);
                }
                RejectReason::Duplicate => {
                    debug!(target: LOG_TARGET, "Rejected {}: duplicate lyrics", label);
                }
            },
            FetchEvent::Cancelled { generation } => {
                debug!(target: LOG_TARGET, "Fetch generation {} superseded", generation);
            }
            FetchEvent::Completed { total, selected } => match selected {
                Some(label) => {
                    info!(target: LOG_TARGET, "Found {} result(s), using {}", total, label);
                }
                None => info!(target: LOG_TARGET, "No lyrics found"),
            },
            FetchEvent::Saved { label } => {
                debug!(target: LOG_TARGET, "Saved {} lyrics to cache", label);
            }
            FetchEvent::Switched {
                index,
                total,
                label,
            } => {
                info!(target: LOG_TARGET, "Switched to result {}/{}: {}", index + 1, total, label);
            }
        }
    }
}
