//! # Fleet registry: identity → running bot.
//!
//! Process-wide single source of truth for what is running, read by the
//! broadcast engine and the control-channel reports.
//!
//! ## Rules
//! - Keys are unique; inserting an already-registered identity is rejected.
//! - Entries are never removed in normal operation; a supervisor that died
//!   stays registered as a dead entry (visible via [`BotEntry::is_active`]).
//! - Iteration order is insertion order, which is what "registry order"
//!   means for broadcast and for tie-breaking in the top-bots report.
//! - Size never exceeds the admission ceiling: the launcher claims slots
//!   before inserting and is the only task that inserts.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use tokio::sync::RwLock;
use tokio::task::AbortHandle;

use crate::error::FleetError;
use crate::fleet::stats::BotStats;
use crate::fleet::supervisor::SupervisorState;
use crate::platform::{BotHandle, Identity};

/// One registered bot: session handle, stats, and the supervisor task.
pub struct BotEntry {
    handle: BotHandle,
    stats: Arc<BotStats>,
    task: OnceLock<AbortHandle>,
}

impl BotEntry {
    /// The bot's live session handle.
    pub fn handle(&self) -> &BotHandle {
        &self.handle
    }

    /// The bot's stats (single-writer, many readers).
    pub fn stats(&self) -> &Arc<BotStats> {
        &self.stats
    }

    /// Lifecycle state of the owning supervisor, derived from the bound
    /// task: not yet bound means registration just happened.
    pub fn state(&self) -> SupervisorState {
        match self.task.get() {
            None => SupervisorState::Starting,
            Some(task) if task.is_finished() => SupervisorState::Terminated,
            Some(_) => SupervisorState::Polling,
        }
    }

    /// True while the supervisor task is still running. A registered entry
    /// whose supervisor terminated reads `false` but stays registered.
    pub fn is_active(&self) -> bool {
        self.state() != SupervisorState::Terminated
    }
}

struct Inner {
    order: Vec<Identity>,
    entries: HashMap<Identity, Arc<BotEntry>>,
}

/// Insertion-ordered mapping of identity → running bot.
pub struct FleetRegistry {
    inner: RwLock<Inner>,
}

impl FleetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                order: Vec::new(),
                entries: HashMap::new(),
            }),
        }
    }

    /// Registers a new identity. Fails with
    /// [`FleetError::DuplicateIdentity`] if the identity is already present;
    /// the registry is unchanged in that case.
    pub async fn insert(
        &self,
        identity: Identity,
        handle: BotHandle,
        stats: Arc<BotStats>,
    ) -> Result<(), FleetError> {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&identity) {
            return Err(FleetError::DuplicateIdentity { identity });
        }
        inner.order.push(identity.clone());
        inner.entries.insert(
            identity,
            Arc::new(BotEntry {
                handle,
                stats,
                task: OnceLock::new(),
            }),
        );
        Ok(())
    }

    /// Binds the supervisor task to a registered identity. Set once, right
    /// after the supervisor is spawned.
    pub async fn bind_task(&self, identity: &Identity, task: AbortHandle) {
        let inner = self.inner.read().await;
        if let Some(entry) = inner.entries.get(identity) {
            let _ = entry.task.set(task);
        }
    }

    /// Number of registered identities (dead entries included).
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// True if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// True if the identity is registered.
    pub async fn contains(&self, identity: &Identity) -> bool {
        self.inner.read().await.entries.contains_key(identity)
    }

    /// Entry for one identity, if registered.
    pub async fn get(&self, identity: &Identity) -> Option<Arc<BotEntry>> {
        self.inner.read().await.entries.get(identity).cloned()
    }

    /// All entries in registry (insertion) order.
    pub async fn entries(&self) -> Vec<(Identity, Arc<BotEntry>)> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).map(|e| (id.clone(), Arc::clone(e))))
            .collect()
    }

    /// Identities in registry order.
    pub async fn identities(&self) -> Vec<Identity> {
        self.inner.read().await.order.clone()
    }

    /// Sum of message counters across all bots.
    pub async fn total_messages(&self) -> u64 {
        let inner = self.inner.read().await;
        inner.entries.values().map(|e| e.stats.messages()).sum()
    }
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
