//! # BotSupervisor: per-identity long-poll loop.
//!
//! One supervisor per running identity. It exclusively owns the bot's
//! session and is the only writer of the bot's stats.
//!
//! ## State machine
//! ```text
//! Starting ──► Polling ──► Terminated        (no retry, no restart)
//!
//! loop {
//!   ├─► receive_next_message (long-poll, indefinite)
//!   │       ├─ Ok(msg)  ──► bump message counter
//!   │       │              record sender in own set + global directory
//!   │       │              send fixed reply (failure logged, loop continues)
//!   │       └─ Err(e)   ──► publish BotTerminated, break
//!   └─ runtime token cancelled ──► break
//! }
//! on exit: close session exactly once
//! ```
//!
//! A terminated identity stays in the registry as a dead entry; nothing
//! restarts it.

use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::fleet::stats::BotStats;
use crate::platform::{BotHandle, Identity, Platform};
use crate::storage::RecipientDirectory;

/// Lifecycle states of one supervisor, derived from its registry entry
/// (see [`BotEntry::state`](crate::fleet::BotEntry::state)). There is no
/// path out of `Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    /// Resolution and registration in progress (driven by the launcher).
    Starting,
    /// Long-poll loop running.
    Polling,
    /// Fatal poll failure or shutdown; session released.
    Terminated,
}

/// Supervises the long-poll loop of a single registered identity.
pub struct BotSupervisor {
    identity: Identity,
    handle: BotHandle,
    stats: Arc<BotStats>,
    platform: Arc<dyn Platform>,
    directory: Arc<RecipientDirectory>,
    reply_text: Arc<str>,
    bus: Bus,
}

impl BotSupervisor {
    /// Creates a supervisor for an identity that has already been resolved
    /// and registered.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Identity,
        handle: BotHandle,
        stats: Arc<BotStats>,
        platform: Arc<dyn Platform>,
        directory: Arc<RecipientDirectory>,
        reply_text: Arc<str>,
        bus: Bus,
    ) -> Self {
        Self {
            identity,
            handle,
            stats,
            platform,
            directory,
            reply_text,
            bus,
        }
    }

    /// Runs the poll loop until a fatal poll failure or cancellation, then
    /// releases the session.
    pub async fn run(self, token: CancellationToken) {
        loop {
            let msg = select! {
                _ = token.cancelled() => {
                    tracing::debug!(identity = %self.identity, "supervisor cancelled");
                    break;
                }
                msg = self.platform.receive_next_message(&self.handle) => msg,
            };

            match msg {
                Ok(inbound) => self.handle_message(inbound.sender).await,
                Err(e) => {
                    // Any failure of the poll call itself is fatal to this
                    // supervisor; per-message reply failures are not.
                    self.bus.publish(
                        Event::now(EventKind::BotTerminated)
                            .with_identity(self.identity.as_str())
                            .with_reason(e.to_string()),
                    );
                    break;
                }
            }
        }

        self.handle.close(self.platform.as_ref()).await;
    }

    async fn handle_message(&self, sender: crate::platform::RecipientId) {
        self.stats.record_message(sender).await;
        self.directory.record(sender).await;

        if let Err(e) = self
            .platform
            .send_message(&self.handle, sender, &self.reply_text)
            .await
        {
            self.bus.publish(
                Event::now(EventKind::ReplyFailed)
                    .with_identity(self.identity.as_str())
                    .with_reason(e.to_string()),
            );
        }
    }
}
