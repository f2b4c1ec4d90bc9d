//! # Built-in logging subscriber.
//!
//! [`LogWriter`] renders every runtime event through `tracing`, one line per
//! event. Useful as-is for deployments; implement a custom
//! [`Subscribe`](crate::subscribers::Subscribe) for metrics or alerting.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Renders runtime events as `tracing` records.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::BotStarting => {
                tracing::debug!(credential = e.credential.as_deref(), "bot starting");
            }
            EventKind::BotRegistered => {
                tracing::info!(identity = e.identity.as_deref(), "bot registered, polling");
            }
            EventKind::BotDuplicate => {
                tracing::warn!(identity = e.identity.as_deref(), "already running, skipped");
            }
            EventKind::BotStartFailed => {
                tracing::warn!(
                    credential = e.credential.as_deref(),
                    reason = e.reason.as_deref(),
                    "bot failed to start"
                );
            }
            EventKind::BotTerminated => {
                tracing::error!(
                    identity = e.identity.as_deref(),
                    reason = e.reason.as_deref(),
                    "bot terminated"
                );
            }
            EventKind::ReplyFailed => {
                tracing::warn!(
                    identity = e.identity.as_deref(),
                    reason = e.reason.as_deref(),
                    "reply send failed"
                );
            }
            EventKind::BatchStarted => {
                tracing::info!(batch = e.batch, size = e.planned, "launch batch starting");
            }
            EventKind::BatchCompleted => {
                tracing::info!(
                    batch = e.batch,
                    started = e.successful,
                    failed = e.failed,
                    "launch batch completed"
                );
            }
            EventKind::LaunchCompleted => {
                tracing::info!(
                    started = e.successful,
                    failed = e.failed,
                    duplicates = e.skipped,
                    "launch completed"
                );
            }
            EventKind::LimitReached => {
                tracing::warn!(reason = e.reason.as_deref(), "bot limit reached");
            }
            EventKind::OverflowSaved => {
                tracing::info!(count = e.skipped, "overflow credentials saved");
            }
            EventKind::LimitChanged => {
                tracing::info!(change = e.reason.as_deref(), "bot limit updated");
            }
            EventKind::BroadcastStarted => {
                tracing::info!(planned = e.planned, bots = e.processed, "broadcast starting");
            }
            EventKind::BroadcastProgress => {
                tracing::info!(
                    identity = e.identity.as_deref(),
                    successful = e.successful,
                    failed = e.failed,
                    bots = e.processed,
                    planned = e.planned,
                    "broadcast progress"
                );
            }
            EventKind::BroadcastCancelled => {
                tracing::warn!(
                    successful = e.successful,
                    failed = e.failed,
                    bots = e.processed,
                    "broadcast cancelled"
                );
            }
            EventKind::BroadcastCompleted => {
                tracing::info!(
                    successful = e.successful,
                    failed = e.failed,
                    bots = e.processed,
                    "broadcast completed"
                );
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
