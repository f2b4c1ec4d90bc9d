//! # Batched fleet launch.
//!
//! [`FleetLauncher`] drives the admission → resolve → register → spawn
//! pipeline for a set of credentials:
//!
//! ```text
//! credentials
//!    │  admission: grant min(n, available) slots
//!    ├──────────────► overflow ──► overflow file + operator notice
//!    ▼
//! sub-batches of `batch_size`, launched concurrently (join_all),
//! fixed `batch_delay` pause between sub-batches (not after the last)
//!    ▼
//! per credential: clear stale registration → resolve → open session
//!                 → register → spawn supervisor
//! ```
//!
//! Duplicates are idempotent no-ops, counted separately from failures. The
//! launcher is the only task that inserts into the registry, so the
//! check-then-claim admission window cannot be raced.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::FleetConfig;
use crate::events::{Bus, Event, EventKind};
use crate::fleet::admission::AdmissionController;
use crate::fleet::registry::FleetRegistry;
use crate::fleet::resolver::IdentityResolver;
use crate::fleet::stats::BotStats;
use crate::fleet::supervisor::BotSupervisor;
use crate::platform::{Credential, Platform};
use crate::storage::{RecipientDirectory, TokenStore};

/// Operator feedback sink used during a launch (progress notices, overflow
/// file delivery). The control channel implements this over its own session;
/// [`NoNotify`] discards everything for headless launches.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Delivers a short text notice.
    async fn text(&self, text: &str);

    /// Delivers a file with a caption.
    async fn document(&self, file: &Path, caption: &str);
}

/// Discards all notifications.
pub struct NoNotify;

#[async_trait]
impl Notify for NoNotify {
    async fn text(&self, _text: &str) {}
    async fn document(&self, _file: &Path, _caption: &str) {}
}

/// Per-credential launch outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LaunchOutcome {
    Started,
    Duplicate,
    Failed,
}

/// Aggregate result of one `launch_batch` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaunchSummary {
    /// Credentials handed in.
    pub requested: usize,
    /// Bots registered and polling.
    pub started: usize,
    /// Credentials that failed to resolve or open a session.
    pub failed: usize,
    /// Credentials that resolved to an already-registered identity.
    pub duplicates: usize,
    /// Credentials spilled to the overflow file.
    pub overflow: usize,
}

/// Admission-gated, batched launcher.
pub struct FleetLauncher {
    platform: Arc<dyn Platform>,
    registry: Arc<FleetRegistry>,
    admission: Arc<AdmissionController>,
    resolver: IdentityResolver,
    directory: Arc<RecipientDirectory>,
    tokens: TokenStore,
    bus: Bus,
    config: FleetConfig,
    runtime: CancellationToken,
}

impl FleetLauncher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<FleetRegistry>,
        admission: Arc<AdmissionController>,
        resolver: IdentityResolver,
        directory: Arc<RecipientDirectory>,
        tokens: TokenStore,
        bus: Bus,
        config: FleetConfig,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            platform,
            registry,
            admission,
            resolver,
            directory,
            tokens,
            bus,
            config,
            runtime,
        }
    }

    /// Launches `credentials` under the admission ceiling.
    ///
    /// Credentials beyond the available slots are written to the overflow
    /// file and delivered to the notifier; the rest launch in sub-batches of
    /// `batch_size` with a `batch_delay` pause between sub-batches.
    pub async fn launch_batch(
        &self,
        credentials: Vec<Credential>,
        notifier: &dyn Notify,
    ) -> LaunchSummary {
        let mut summary = LaunchSummary {
            requested: credentials.len(),
            ..LaunchSummary::default()
        };
        if credentials.is_empty() {
            return summary;
        }

        let granted = self.admission.request_slots(credentials.len()).await;
        let (to_deploy, overflow) = credentials.split_at(granted);
        summary.overflow = overflow.len();

        if !overflow.is_empty() {
            self.spill_overflow(overflow, notifier).await;
        }

        if granted == 0 {
            let occupancy = format!(
                "{}/{} bots running",
                self.registry.len().await,
                self.admission.limit()
            );
            self.bus
                .publish(Event::now(EventKind::LimitReached).with_reason(occupancy.clone()));
            notifier
                .text(&format!(
                    "Bot limit reached ({occupancy}). {} credential(s) saved for later.",
                    overflow.len()
                ))
                .await;
            return summary;
        }

        let batch_size = self.config.batch_size_clamped();
        let batches: Vec<&[Credential]> = to_deploy.chunks(batch_size).collect();
        let total_batches = batches.len();

        for (idx, chunk) in batches.into_iter().enumerate() {
            self.bus.publish(
                Event::now(EventKind::BatchStarted)
                    .with_batch(idx as u32 + 1)
                    .with_planned(chunk.len() as u64),
            );

            let outcomes = join_all(chunk.iter().map(|c| self.launch_single(c))).await;
            for outcome in outcomes {
                match outcome {
                    LaunchOutcome::Started => summary.started += 1,
                    LaunchOutcome::Duplicate => summary.duplicates += 1,
                    LaunchOutcome::Failed => summary.failed += 1,
                }
            }

            self.bus.publish(
                Event::now(EventKind::BatchCompleted)
                    .with_batch(idx as u32 + 1)
                    .with_successful(summary.started as u64)
                    .with_failed(summary.failed as u64),
            );

            notifier
                .text(&format!(
                    "Batch {}/{total_batches}: {} started, {} failed so far.",
                    idx + 1,
                    summary.started,
                    summary.failed
                ))
                .await;

            // Backpressure between sub-batches only; no trailing pause.
            if idx + 1 < total_batches {
                sleep(self.config.batch_delay).await;
            }
        }

        self.bus.publish(
            Event::now(EventKind::LaunchCompleted)
                .with_successful(summary.started as u64)
                .with_failed(summary.failed as u64)
                .with_skipped(summary.duplicates as u64),
        );
        summary
    }

    async fn spill_overflow(&self, overflow: &[Credential], notifier: &dyn Notify) {
        match self.tokens.save_overflow(overflow).await {
            Ok(n) => {
                self.bus
                    .publish(Event::now(EventKind::OverflowSaved).with_skipped(n as u64));
                notifier
                    .document(
                        self.tokens.overflow_path(),
                        &format!("{n} credential(s) over the limit, saved for later"),
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(
                    file = %self.tokens.overflow_path().display(),
                    error = %e,
                    "failed to save overflow credentials"
                );
            }
        }
    }

    /// Launches a single credential end to end.
    async fn launch_single(&self, credential: &Credential) -> LaunchOutcome {
        self.bus
            .publish(Event::now(EventKind::BotStarting).with_credential(credential.prefix()));

        self.resolver.clear_stale_registration(credential).await;

        let identity = match self.resolver.resolve(credential).await {
            Ok(identity) => identity,
            Err(e) => {
                self.bus.publish(
                    Event::now(EventKind::BotStartFailed)
                        .with_credential(credential.prefix())
                        .with_reason(e.to_string()),
                );
                return LaunchOutcome::Failed;
            }
        };

        // Pre-check saves a session open for credentials already running;
        // the insert below is still the authoritative duplicate gate.
        if self.registry.contains(&identity).await {
            self.bus
                .publish(Event::now(EventKind::BotDuplicate).with_identity(identity.as_str()));
            return LaunchOutcome::Duplicate;
        }

        let handle = match self.platform.open_session(credential).await {
            Ok(handle) => handle,
            Err(e) => {
                self.bus.publish(
                    Event::now(EventKind::BotStartFailed)
                        .with_credential(credential.prefix())
                        .with_reason(e.to_string()),
                );
                return LaunchOutcome::Failed;
            }
        };

        let stats = Arc::new(BotStats::new());
        if self
            .registry
            .insert(identity.clone(), handle.clone(), Arc::clone(&stats))
            .await
            .is_err()
        {
            handle.close(self.platform.as_ref()).await;
            self.bus
                .publish(Event::now(EventKind::BotDuplicate).with_identity(identity.as_str()));
            return LaunchOutcome::Duplicate;
        }

        let supervisor = BotSupervisor::new(
            identity.clone(),
            handle,
            stats,
            Arc::clone(&self.platform),
            Arc::clone(&self.directory),
            Arc::clone(&self.config.reply_text),
            self.bus.clone(),
        );
        let token = self.runtime.child_token();
        let join = tokio::spawn(supervisor.run(token));
        self.registry.bind_task(&identity, join.abort_handle()).await;

        self.bus
            .publish(Event::now(EventKind::BotRegistered).with_identity(identity.as_str()));
        LaunchOutcome::Started
    }
}
