//! # Runtime events emitted by the fleet.
//!
//! [`EventKind`] classifies events across four areas: bot lifecycle, batched
//! launch, admission/limit changes, and broadcast progress. The [`Event`]
//! struct carries optional metadata (identity, credential prefix, counters)
//! set per kind.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when events are observed through
//! independent receivers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Bot lifecycle ===
    /// A credential entered the launch pipeline.
    ///
    /// Sets: `credential` (prefix).
    BotStarting,

    /// A bot resolved, registered, and began polling.
    ///
    /// Sets: `identity`.
    BotRegistered,

    /// A credential resolved to an identity that is already registered.
    /// Idempotent no-op, not counted as a launch failure.
    ///
    /// Sets: `identity`.
    BotDuplicate,

    /// A credential failed to launch (resolution or session failure).
    ///
    /// Sets: `credential` (prefix), `reason`.
    BotStartFailed,

    /// A supervisor hit a fatal poll failure and terminated. The identity
    /// stays registered as a dead entry.
    ///
    /// Sets: `identity`, `reason`.
    BotTerminated,

    /// A reply send failed; the poll loop continues.
    ///
    /// Sets: `identity`, `reason`.
    ReplyFailed,

    // === Batched launch ===
    /// A launch sub-batch is starting.
    ///
    /// Sets: `batch` (1-based index), `planned` (sub-batch size).
    BatchStarted,

    /// A launch sub-batch finished.
    ///
    /// Sets: `batch`, `successful`, `failed` (running totals).
    BatchCompleted,

    /// The whole `launch_batch` call finished.
    ///
    /// Sets: `successful`, `failed`, `skipped` (duplicates).
    LaunchCompleted,

    // === Admission ===
    /// Launch requested with no available slots.
    ///
    /// Sets: `reason` (occupancy summary).
    LimitReached,

    /// Overflow credentials were persisted for later retry.
    ///
    /// Sets: `skipped` (credential count).
    OverflowSaved,

    /// The identity ceiling changed.
    ///
    /// Sets: `reason` ("old -> new").
    LimitChanged,

    // === Broadcast ===
    /// A broadcast job started.
    ///
    /// Sets: `planned` (total sends), `processed` (total bots).
    BroadcastStarted,

    /// Periodic broadcast progress.
    ///
    /// Sets: `identity` (current bot), `successful`, `failed`, `processed`
    /// (bots processed so far), `planned`.
    BroadcastProgress,

    /// Broadcast stopped on a cancel request; partial report.
    ///
    /// Sets: `successful`, `failed`, `processed`.
    BroadcastCancelled,

    /// Broadcast ran to natural completion; final report.
    ///
    /// Sets: `successful`, `failed`, `processed`.
    BroadcastCompleted,

    // === Runtime ===
    /// Fleet shutdown requested; supervisors are being cancelled.
    ShutdownRequested,
}

/// Runtime event with optional metadata.
///
/// `seq` is a monotonic global sequence for ordering; `at` is a wall-clock
/// timestamp for logs. The remaining fields are set depending on the
/// [`EventKind`].
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Bot identity, if applicable.
    pub identity: Option<Arc<str>>,
    /// Credential prefix (never the full token).
    pub credential: Option<Arc<str>>,
    /// Human-readable reason (errors, occupancy summaries).
    pub reason: Option<Arc<str>>,
    /// 1-based sub-batch index.
    pub batch: Option<u32>,
    /// Successful-operation counter.
    pub successful: Option<u64>,
    /// Failed-operation counter.
    pub failed: Option<u64>,
    /// Skipped-item counter (duplicates, overflow credentials).
    pub skipped: Option<u64>,
    /// Items processed so far (bots, for broadcast events).
    pub processed: Option<u64>,
    /// Total items planned.
    pub planned: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            identity: None,
            credential: None,
            reason: None,
            batch: None,
            successful: None,
            failed: None,
            skipped: None,
            processed: None,
            planned: None,
        }
    }

    /// Attaches a bot identity.
    #[inline]
    pub fn with_identity(mut self, identity: impl Into<Arc<str>>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Attaches a credential prefix.
    #[inline]
    pub fn with_credential(mut self, prefix: impl Into<Arc<str>>) -> Self {
        self.credential = Some(prefix.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a 1-based sub-batch index.
    #[inline]
    pub fn with_batch(mut self, batch: u32) -> Self {
        self.batch = Some(batch);
        self
    }

    /// Attaches a successful-operation count.
    #[inline]
    pub fn with_successful(mut self, n: u64) -> Self {
        self.successful = Some(n);
        self
    }

    /// Attaches a failed-operation count.
    #[inline]
    pub fn with_failed(mut self, n: u64) -> Self {
        self.failed = Some(n);
        self
    }

    /// Attaches a skipped-item count.
    #[inline]
    pub fn with_skipped(mut self, n: u64) -> Self {
        self.skipped = Some(n);
        self
    }

    /// Attaches a processed-item count.
    #[inline]
    pub fn with_processed(mut self, n: u64) -> Self {
        self.processed = Some(n);
        self
    }

    /// Attaches a planned-item total.
    #[inline]
    pub fn with_planned(mut self, n: u64) -> Self {
        self.planned = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::now(EventKind::BotStarting);
        let b = Event::now(EventKind::BotRegistered);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builder_sets_fields() {
        let ev = Event::now(EventKind::BroadcastProgress)
            .with_identity("alpha_bot")
            .with_successful(10)
            .with_failed(2)
            .with_processed(1)
            .with_planned(40);
        assert_eq!(ev.identity.as_deref(), Some("alpha_bot"));
        assert_eq!(ev.successful, Some(10));
        assert_eq!(ev.failed, Some(2));
        assert_eq!(ev.planned, Some(40));
    }
}
