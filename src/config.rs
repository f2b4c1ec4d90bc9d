//! # Global fleet configuration.
//!
//! Provides [`FleetConfig`], centralized settings for the fleet runtime:
//! launch batching, retry bounds, broadcast pacing, control-channel paging,
//! the durable file paths, and the fixed reply sent by every bot.
//!
//! All fields are public for flexibility; defaults are conservative for a
//! shared platform (batch of 50 every 10 s, ceiling 100, page size 50).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the fleet runtime.
#[derive(Clone, Debug)]
pub struct FleetConfig {
    /// Identity ceiling used when the durable limit file is absent.
    pub default_limit: usize,

    /// Maximum credentials launched concurrently per sub-batch.
    pub batch_size: usize,

    /// Pause between sub-batches. This is the backpressure knob protecting
    /// the shared platform from burst abuse-detection.
    pub batch_delay: Duration,

    /// Bounded retry for identity resolution; retries apply to `Conflict`
    /// errors only.
    pub resolve_retry: RetryPolicy,

    /// Bounded retry for clearing a stale push registration.
    pub webhook_retry: RetryPolicy,

    /// Within one bot, sleep [`FleetConfig::pace_delay`] after this many
    /// broadcast sends. Coarse pacing, not a precise rate limiter.
    pub pace_every: usize,

    /// Sleep applied by the broadcast pacing rule.
    pub pace_delay: Duration,

    /// Emit a broadcast progress update after this many global sends.
    pub progress_every: usize,

    /// Bots per page in the control-channel listing.
    pub page_size: usize,

    /// Number of entries in the `topbots` report.
    pub top_bots: usize,

    /// Capacity of the event bus ring buffer (minimum 1, clamped).
    pub bus_capacity: usize,

    /// Fixed reply sent to every inbound message.
    pub reply_text: Arc<str>,

    /// Files scanned for credentials at startup and by `gettoken`.
    pub token_files: Vec<PathBuf>,

    /// Append-only recipient directory file.
    pub recipients_file: PathBuf,

    /// Durable ceiling file (single integer, overwritten in full).
    pub limit_file: PathBuf,

    /// Overflow credentials file (overwritten in full on every spillover).
    pub overflow_file: PathBuf,
}

impl FleetConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a batch size clamped to a minimum of 1.
    #[inline]
    pub fn batch_size_clamped(&self) -> usize {
        self.batch_size.max(1)
    }
}

impl Default for FleetConfig {
    /// Default configuration:
    ///
    /// - `default_limit = 100`
    /// - `batch_size = 50`, `batch_delay = 10s`
    /// - `resolve_retry = 3 attempts / 2s`, `webhook_retry = 2 attempts / 2s`
    /// - broadcast pacing: sleep 1s every 30 sends, progress every 50 sends
    /// - `page_size = 50`, `top_bots = 20`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            default_limit: 100,
            batch_size: 50,
            batch_delay: Duration::from_secs(10),
            resolve_retry: RetryPolicy::new(3, Duration::from_secs(2)),
            webhook_retry: RetryPolicy::new(2, Duration::from_secs(2)),
            pace_every: 30,
            pace_delay: Duration::from_secs(1),
            progress_every: 50,
            page_size: 50,
            top_bots: 20,
            bus_capacity: 1024,
            reply_text: Arc::from("Thanks for reaching out! This inbox is automated."),
            token_files: vec![PathBuf::from("token1.txt")],
            recipients_file: PathBuf::from("user_ids.txt"),
            limit_file: PathBuf::from("bot_config.txt"),
            overflow_file: PathBuf::from("remaining_tokens.txt"),
        }
    }
}
