//! # Cancellable broadcast fan-out.
//!
//! [`Broadcaster`] pushes one message to every recipient each bot has ever
//! seen, bot by bot in registry order. At most one job runs at a time.
//!
//! ## Job state machine
//! ```text
//! Idle ──run()──► Running ──cancel()──► CancelRequested
//!                    │                        │
//!                    ▼                        ▼
//!                (completed)             (cancelled)
//!                    └────────── Idle ◄───────┘
//! ```
//!
//! Recipient sets are snapshotted per bot when the job reaches that bot, so
//! messages arriving mid-broadcast do not extend the job. Cancellation is
//! checked before every bot and before every send; a bot interrupted mid-way
//! still counts as processed. Per-recipient send failures are counted and
//! skipped, never fatal.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::FleetConfig;
use crate::error::BroadcastError;
use crate::events::{Bus, Event, EventKind};
use crate::fleet::FleetRegistry;
use crate::platform::Platform;

/// Lifecycle of the single broadcast slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JobState {
    Idle,
    Running,
    CancelRequested,
}

/// How a broadcast job ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Every snapshotted recipient of every bot was attempted.
    Completed,
    /// Stopped early on a cancel request.
    Cancelled,
}

/// Final (or partial, when cancelled) broadcast accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BroadcastReport {
    pub outcome: BroadcastOutcome,
    /// Sends acknowledged by the platform.
    pub successful: u64,
    /// Sends rejected by the platform (recipient skipped).
    pub failed: u64,
    /// Bots whose recipient list was entered, including one interrupted
    /// mid-way by a cancel. Bots with an empty snapshot are skipped and
    /// not counted.
    pub bots_processed: usize,
    /// Bots registered when the job started.
    pub total_bots: usize,
    /// Sends planned from the per-bot snapshots taken at start.
    pub planned: u64,
}

impl BroadcastReport {
    /// Percentage of attempted sends that succeeded. 100 when nothing was
    /// attempted.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.successful + self.failed;
        if attempted == 0 {
            return 100.0;
        }
        self.successful as f64 / attempted as f64 * 100.0
    }
}

struct Inner {
    platform: Arc<dyn Platform>,
    registry: Arc<FleetRegistry>,
    bus: Bus,
    pace_every: usize,
    pace_delay: std::time::Duration,
    progress_every: usize,
    state: Mutex<JobState>,
}

/// Single-slot broadcast engine over the fleet registry.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    pub(crate) fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<FleetRegistry>,
        bus: Bus,
        config: &FleetConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform,
                registry,
                bus,
                pace_every: config.pace_every.max(1),
                pace_delay: config.pace_delay,
                progress_every: config.progress_every.max(1),
                state: Mutex::new(JobState::Idle),
            }),
        }
    }

    /// Requests cancellation of the running job. Returns `false` when no job
    /// is running; the request is then dropped, it does not pre-cancel a
    /// future job.
    pub async fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if *state == JobState::Running {
            *state = JobState::CancelRequested;
            true
        } else {
            false
        }
    }

    /// True while a job occupies the broadcast slot.
    pub async fn is_running(&self) -> bool {
        *self.inner.state.lock().await != JobState::Idle
    }

    async fn cancel_requested(&self) -> bool {
        *self.inner.state.lock().await == JobState::CancelRequested
    }

    /// Runs a broadcast of `message` to every known recipient of every bot.
    ///
    /// Fails with [`BroadcastError::AlreadyRunning`] when the slot is
    /// occupied and [`BroadcastError::NoBots`] on an empty registry.
    pub async fn run(&self, message: &str) -> Result<BroadcastReport, BroadcastError> {
        {
            let mut state = self.inner.state.lock().await;
            if *state != JobState::Idle {
                return Err(BroadcastError::AlreadyRunning);
            }
            *state = JobState::Running;
        }

        let entries = self.inner.registry.entries().await;
        if entries.is_empty() {
            *self.inner.state.lock().await = JobState::Idle;
            return Err(BroadcastError::NoBots);
        }

        // Plan from a snapshot of every bot's recipients taken up front;
        // the per-bot snapshot below is what is actually sent to.
        let mut planned = 0u64;
        for (_, entry) in &entries {
            planned += entry.stats().recipient_count().await as u64;
        }
        let total_bots = entries.len();

        self.inner.bus.publish(
            Event::now(EventKind::BroadcastStarted)
                .with_planned(planned)
                .with_processed(total_bots as u64),
        );

        let mut successful = 0u64;
        let mut failed = 0u64;
        let mut global_sends = 0u64;
        let mut bots_processed = 0usize;
        let mut cancelled = false;

        'bots: for (identity, entry) in entries {
            if self.cancel_requested().await {
                cancelled = true;
                break 'bots;
            }

            let recipients = entry.stats().snapshot_recipients().await;
            // Bots with nothing to send are passed over without counting.
            if recipients.is_empty() {
                continue;
            }
            let mut sends_this_bot = 0usize;

            for recipient in recipients {
                if self.cancel_requested().await {
                    cancelled = true;
                    break;
                }

                match self
                    .inner
                    .platform
                    .send_message(entry.handle(), recipient, message)
                    .await
                {
                    Ok(_) => successful += 1,
                    Err(e) => {
                        failed += 1;
                        tracing::debug!(
                            identity = %identity,
                            recipient = %recipient,
                            error = e.as_label(),
                            "broadcast send failed"
                        );
                    }
                }

                global_sends += 1;
                if global_sends % self.inner.progress_every as u64 == 0 {
                    self.inner.bus.publish(
                        Event::now(EventKind::BroadcastProgress)
                            .with_identity(identity.as_str())
                            .with_successful(successful)
                            .with_failed(failed)
                            .with_processed(bots_processed as u64)
                            .with_planned(planned),
                    );
                }

                sends_this_bot += 1;
                if sends_this_bot % self.inner.pace_every == 0 {
                    sleep(self.inner.pace_delay).await;
                }
            }

            // A bot entered counts as processed even when the cancel landed
            // mid-way through its recipients.
            bots_processed += 1;
            if cancelled {
                break 'bots;
            }
        }

        let outcome = if cancelled {
            BroadcastOutcome::Cancelled
        } else {
            BroadcastOutcome::Completed
        };
        let kind = match outcome {
            BroadcastOutcome::Cancelled => EventKind::BroadcastCancelled,
            BroadcastOutcome::Completed => EventKind::BroadcastCompleted,
        };
        self.inner.bus.publish(
            Event::now(kind)
                .with_successful(successful)
                .with_failed(failed)
                .with_processed(bots_processed as u64),
        );

        *self.inner.state.lock().await = JobState::Idle;

        Ok(BroadcastReport {
            outcome,
            successful,
            failed,
            bots_processed,
            total_bots,
            planned,
        })
    }
}
