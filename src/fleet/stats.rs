//! # Per-bot statistics.
//!
//! [`BotStats`] holds the message counter and distinct-recipient set for one
//! identity. Both are monotonic: the counter only increments, the set only
//! grows.
//!
//! ## Write discipline
//! Exactly one task writes — the owning supervisor. Everything else (the
//! broadcast engine, the control-channel reports) only reads. Readers that
//! need a stable view for iteration must take [`BotStats::snapshot_recipients`]
//! rather than hold the live set, since it may still be growing concurrently.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::platform::RecipientId;

/// Monotonic counters for one bot identity.
#[derive(Default)]
pub struct BotStats {
    messages: AtomicU64,
    recipients: RwLock<HashSet<RecipientId>>,
}

impl BotStats {
    /// Fresh, zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one inbound message from `sender`. Returns `true` if the
    /// sender is a recipient this bot has not seen before.
    ///
    /// Only the owning supervisor may call this.
    pub async fn record_message(&self, sender: RecipientId) -> bool {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.recipients.write().await.insert(sender)
    }

    /// Total messages ever received by this bot.
    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Number of distinct recipients ever observed by this bot.
    pub async fn recipient_count(&self) -> usize {
        self.recipients.read().await.len()
    }

    /// Copy of the recipient set, sorted. The sort gives broadcast a stable
    /// iteration order.
    pub async fn snapshot_recipients(&self) -> Vec<RecipientId> {
        let mut ids: Vec<RecipientId> = self.recipients.read().await.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaying_a_sender_grows_counter_but_not_set() {
        let stats = BotStats::new();
        assert!(stats.record_message(RecipientId(5)).await);
        assert!(!stats.record_message(RecipientId(5)).await);
        assert_eq!(stats.messages(), 2);
        assert_eq!(stats.recipient_count().await, 1);
    }

    #[tokio::test]
    async fn snapshot_is_sorted_and_detached() {
        let stats = BotStats::new();
        stats.record_message(RecipientId(9)).await;
        stats.record_message(RecipientId(1)).await;
        let snap = stats.snapshot_recipients().await;
        assert_eq!(snap, vec![RecipientId(1), RecipientId(9)]);

        // Growth after the snapshot does not affect the copy.
        stats.record_message(RecipientId(4)).await;
        assert_eq!(snap.len(), 2);
    }
}
