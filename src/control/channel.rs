//! # Privileged control channel.
//!
//! [`ControlChannel`] is a dedicated bot session through which a single
//! authorized operator drives the fleet: launching credentials, adjusting
//! the ceiling, inspecting stats and capacity, running broadcasts.
//!
//! Every inbound message is authorized first; anything from a sender other
//! than the configured admin gets a fixed rejection and is otherwise
//! ignored. Commands execute strictly in arrival order, except broadcasts,
//! which run in a spawned task so `/cancel` stays reachable mid-job.

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{BroadcastOutcome, BroadcastReport};
use crate::control::command::Command;
use crate::events::EventKind;
use crate::fleet::{CapacityEstimator, Fleet, HostMetrics, LaunchSummary, Notify};
use crate::platform::{BotHandle, Credential, DocumentRef, InboundMessage, MessageId, RecipientId};

const UNAUTHORIZED: &str = "Unauthorized.";

const HELP: &str = "Fleet control commands:\n\
    /stats - fleet summary\n\
    /capacity - host capacity report\n\
    /setlimit <n> - change the bot ceiling\n\
    /bots [page] - list registered bots\n\
    /topbots - busiest bots\n\
    /gettoken <@identity> - reverse credential lookup\n\
    /broadcast <message> - message every known recipient\n\
    /cancel - stop the running broadcast\n\
    Send a token or upload a .txt file to launch bots.";

/// Operator-facing control bot bound to one admin recipient.
pub struct ControlChannel<M: HostMetrics> {
    fleet: Arc<Fleet>,
    handle: BotHandle,
    admin: RecipientId,
    estimator: CapacityEstimator<M>,
}

impl<M: HostMetrics> ControlChannel<M> {
    /// Opens the control session: clears any stale push registration on the
    /// control credential, then binds a session.
    pub async fn open(
        fleet: Arc<Fleet>,
        credential: Credential,
        admin: RecipientId,
        metrics: M,
    ) -> Result<Self, crate::PlatformError> {
        let platform = Arc::clone(fleet.platform());
        if let Err(e) = platform.clear_push_registration(&credential).await {
            tracing::warn!(
                credential = %credential.prefix(),
                error = e.as_label(),
                "failed to clear control-channel push registration, continuing"
            );
        }
        let handle = platform.open_session(&credential).await?;
        Ok(Self {
            fleet,
            handle,
            admin,
            estimator: CapacityEstimator::new(metrics),
        })
    }

    /// Serves operator commands until cancellation or a fatal poll failure,
    /// then releases the control session.
    pub async fn run(&self, token: CancellationToken) {
        loop {
            let msg = select! {
                _ = token.cancelled() => break,
                msg = self.fleet.platform().receive_next_message(&self.handle) => msg,
            };
            match msg {
                Ok(inbound) => self.handle_message(inbound).await,
                Err(e) => {
                    tracing::error!(error = e.as_label(), "control channel poll failed");
                    break;
                }
            }
        }
        self.handle.close(self.fleet.platform().as_ref()).await;
    }

    /// Authorizes and dispatches one inbound message.
    pub async fn handle_message(&self, message: InboundMessage) {
        if message.sender != self.admin {
            tracing::warn!(sender = %message.sender, "rejected non-admin control message");
            self.send_to(message.sender, UNAUTHORIZED).await;
            return;
        }

        match Command::parse(&message) {
            Command::Start => self.reply(HELP).await,
            Command::Stats => self.cmd_stats().await,
            Command::Capacity => self.cmd_capacity().await,
            Command::SetLimit(value) => self.cmd_setlimit(value).await,
            Command::Bots { page } => self.cmd_bots(page).await,
            Command::TopBots => self.cmd_topbots().await,
            Command::GetToken(identity) => self.cmd_gettoken(identity).await,
            Command::Broadcast(body) => self.cmd_broadcast(body).await,
            Command::CancelBroadcast => self.cmd_cancel().await,
            Command::UploadTokens(doc) => self.cmd_upload(doc).await,
            Command::InlineToken(credential) => self.launch_and_report(vec![credential]).await,
            Command::Unknown => {
                self.reply("Unrecognized command. Send /start for help.").await;
            }
        }
    }

    async fn cmd_stats(&self) {
        let registry = self.fleet.registry();
        let entries = registry.entries().await;
        let active = {
            let mut n = 0usize;
            for (_, entry) in &entries {
                if entry.is_active() {
                    n += 1;
                }
            }
            n
        };
        let total = entries.len();
        let limit = self.fleet.admission().limit();
        let available = self.fleet.admission().available().await;
        let messages = registry.total_messages().await;
        let recipients = self.fleet.directory().len().await;
        let broadcast = if self.fleet.broadcaster().is_running().await {
            "running"
        } else {
            "idle"
        };

        let mut text = format!(
            "Fleet stats\n\
             Bots: {total} registered, {active} active\n\
             Limit: {limit} ({available} slots free)\n\
             Messages received: {messages}\n\
             Known recipients: {recipients}\n\
             Broadcast: {broadcast}"
        );
        if let Some(usage) = self.estimator.usage() {
            text.push('\n');
            text.push_str(&usage.summary());
        }
        self.reply(&text).await;
    }

    async fn cmd_capacity(&self) {
        let current = self.fleet.registry().len().await;
        let limit = self.fleet.admission().limit();
        match self.estimator.estimate(current, limit) {
            Ok(report) => {
                let mut text = format!(
                    "Host capacity\n\
                     CPU cores: {}\n\
                     RAM: {:.1} GB\n\
                     Estimated capacity: {} bots\n\
                     Running: {} / limit {} ({} free)",
                    report.cpu_cores,
                    report.ram_gb,
                    report.estimated_capacity,
                    report.current,
                    report.limit,
                    report.available
                );
                if let Some(usage) = self.estimator.usage() {
                    text.push('\n');
                    text.push_str(&usage.summary());
                }
                if report.limit_exceeds_estimate() {
                    text.push_str(&format!(
                        "\nWarning: limit {} exceeds the estimated capacity of {}.",
                        report.limit, report.estimated_capacity
                    ));
                }
                self.reply(&text).await;
            }
            Err(e) => self.reply(&e.to_string()).await,
        }
    }

    async fn cmd_setlimit(&self, value: Option<usize>) {
        let Some(new_limit) = value else {
            self.reply("Usage: /setlimit <number>").await;
            return;
        };
        match self.fleet.admission().set_limit(new_limit).await {
            Ok(change) => {
                self.reply(&format!("Bot limit updated: {} -> {}.", change.old, change.new))
                    .await;
            }
            Err(e) => self.reply(&e.to_string()).await,
        }
    }

    async fn cmd_bots(&self, page: usize) {
        let entries = self.fleet.registry().entries().await;
        if entries.is_empty() {
            self.reply("No bots registered.").await;
            return;
        }

        let page_size = self.fleet.config().page_size.max(1);
        let total_pages = entries.len().div_ceil(page_size);
        let page = page.min(total_pages);
        let start = (page - 1) * page_size;
        let slice = &entries[start..entries.len().min(start + page_size)];

        let mut text = format!("Bots (page {page}/{total_pages}, {} total)\n", entries.len());
        for (offset, (identity, entry)) in slice.iter().enumerate() {
            let marker = if entry.is_active() { "" } else { " [inactive]" };
            text.push_str(&format!(
                "{}. @{} - {} msgs, {} recipients{}\n",
                start + offset + 1,
                identity,
                entry.stats().messages(),
                entry.stats().recipient_count().await,
                marker
            ));
        }
        if page < total_pages {
            text.push_str(&format!("Send /bots {} for the next page.", page + 1));
        }
        self.reply(text.trim_end()).await;
    }

    async fn cmd_topbots(&self) {
        let entries = self.fleet.registry().entries().await;
        if entries.is_empty() {
            self.reply("No bots registered.").await;
            return;
        }

        let mut rows = Vec::with_capacity(entries.len());
        for (identity, entry) in entries {
            rows.push((
                identity,
                entry.stats().recipient_count().await,
                entry.stats().messages(),
                entry.is_active(),
            ));
        }
        // Stable sort: registry order breaks ties.
        rows.sort_by_key(|(_, recipients, _, _)| Reverse(*recipients));
        rows.truncate(self.fleet.config().top_bots.max(1));

        let mut text = String::from("Top bots by recipients\n");
        for (rank, (identity, recipients, messages, active)) in rows.into_iter().enumerate() {
            let marker = if active { "" } else { " [inactive]" };
            text.push_str(&format!(
                "{}. @{identity} - {recipients} recipients, {messages} msgs{marker}\n",
                rank + 1
            ));
        }
        self.reply(text.trim_end()).await;
    }

    async fn cmd_gettoken(&self, identity: Option<String>) {
        let Some(wanted) = identity else {
            self.reply("Usage: /gettoken <@identity>").await;
            return;
        };

        // Reverse lookup scans the source files and resolves each credential;
        // unresolvable ones are skipped.
        let platform = self.fleet.platform();
        for credential in self.fleet.load_credentials().await {
            match platform.resolve_identity(&credential).await {
                Ok(found) if found.as_str().eq_ignore_ascii_case(&wanted) => {
                    self.reply(&format!("@{found}: {}", credential.reveal())).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        credential = %credential.prefix(),
                        error = e.as_label(),
                        "skipping unresolvable credential in reverse lookup"
                    );
                }
            }
        }
        self.reply(&format!("No credential found for @{wanted}.")).await;
    }

    async fn cmd_broadcast(&self, body: Option<String>) {
        let Some(message) = body else {
            self.reply("Usage: /broadcast <message>").await;
            return;
        };

        // Pre-flight the cheap rejections so the operator hears back
        // immediately; run() re-checks authoritatively.
        if self.fleet.broadcaster().is_running().await {
            self.reply("A broadcast is already running. Send /cancel to stop it.")
                .await;
            return;
        }
        if self.fleet.registry().is_empty().await {
            self.reply("No bots available for broadcast.").await;
            return;
        }

        let status_id = self.send_returning_id("Broadcast started...").await;
        let guard = CancellationToken::new();
        if let Some(status_id) = status_id {
            self.spawn_progress_editor(status_id, guard.clone());
        }

        let broadcaster = self.fleet.broadcaster().clone();
        let platform = Arc::clone(self.fleet.platform());
        let handle = self.handle.clone();
        let admin = self.admin;
        tokio::spawn(async move {
            let outcome = broadcaster.run(&message).await;
            guard.cancel();
            let text = match outcome {
                Ok(report) => render_broadcast_report(&report),
                Err(e) => e.to_string(),
            };
            if let Err(e) = platform.send_message(&handle, admin, &text).await {
                tracing::warn!(error = e.as_label(), "failed to deliver broadcast summary");
            }
        });
    }

    /// Edits the status message in place on every progress event until the
    /// job publishes a terminal event or the guard fires.
    fn spawn_progress_editor(&self, status_id: MessageId, guard: CancellationToken) {
        let mut rx = self.fleet.bus().subscribe();
        let platform = Arc::clone(self.fleet.platform());
        let handle = self.handle.clone();
        let admin = self.admin;
        tokio::spawn(async move {
            loop {
                let event = select! {
                    _ = guard.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(event) => event,
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                };
                let text = match event.kind {
                    EventKind::BroadcastProgress => format!(
                        "Broadcasting: {} sent of {} planned, {} failed ({} bots done)",
                        event.successful.unwrap_or(0),
                        event.planned.unwrap_or(0),
                        event.failed.unwrap_or(0),
                        event.processed.unwrap_or(0),
                    ),
                    EventKind::BroadcastCompleted | EventKind::BroadcastCancelled => break,
                    _ => continue,
                };
                if let Err(e) = platform.edit_message(&handle, admin, status_id, &text).await {
                    tracing::debug!(error = e.as_label(), "status edit failed");
                }
            }
        });
    }

    async fn cmd_cancel(&self) {
        if self.fleet.broadcaster().cancel().await {
            self.reply("Cancellation requested; the broadcast will stop shortly.")
                .await;
        } else {
            self.reply("No broadcast is running.").await;
        }
    }

    async fn cmd_upload(&self, doc: DocumentRef) {
        let content = match self
            .fleet
            .platform()
            .fetch_document(&self.handle, &doc)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                self.reply(&format!("Failed to download {}: {e}", doc.file_name))
                    .await;
                return;
            }
        };

        let credentials = crate::storage::extract_credentials(&content);
        if credentials.is_empty() {
            self.reply(&format!("No credentials found in {}.", doc.file_name))
                .await;
            return;
        }
        self.reply(&format!(
            "Found {} credential(s) in {}, launching...",
            credentials.len(),
            doc.file_name
        ))
        .await;
        self.launch_and_report(credentials).await;
    }

    async fn launch_and_report(&self, credentials: Vec<Credential>) {
        let summary = self.fleet.launch_batch(credentials, self).await;
        self.reply(&render_launch_summary(&summary)).await;
    }

    async fn reply(&self, text: &str) {
        self.send_to(self.admin, text).await;
    }

    async fn send_to(&self, recipient: RecipientId, text: &str) {
        if let Err(e) = self
            .fleet
            .platform()
            .send_message(&self.handle, recipient, text)
            .await
        {
            tracing::warn!(error = e.as_label(), "control reply failed");
        }
    }

    async fn send_returning_id(&self, text: &str) -> Option<MessageId> {
        match self
            .fleet
            .platform()
            .send_message(&self.handle, self.admin, text)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = e.as_label(), "control reply failed");
                None
            }
        }
    }
}

#[async_trait]
impl<M: HostMetrics> Notify for ControlChannel<M> {
    async fn text(&self, text: &str) {
        self.reply(text).await;
    }

    async fn document(&self, file: &Path, caption: &str) {
        if let Err(e) = self
            .fleet
            .platform()
            .send_document(&self.handle, self.admin, file, caption)
            .await
        {
            tracing::warn!(error = e.as_label(), "control document delivery failed");
        }
    }
}

fn render_launch_summary(summary: &LaunchSummary) -> String {
    format!(
        "Launch finished: {} started, {} failed, {} duplicates, {} saved for later (of {} requested).",
        summary.started, summary.failed, summary.duplicates, summary.overflow, summary.requested
    )
}

fn render_broadcast_report(report: &BroadcastReport) -> String {
    let verdict = match report.outcome {
        BroadcastOutcome::Completed => "Broadcast completed",
        BroadcastOutcome::Cancelled => "Broadcast cancelled",
    };
    format!(
        "{verdict}: {} sent, {} failed ({:.1}% success), {}/{} bots processed.",
        report.successful,
        report.failed,
        report.success_rate(),
        report.bots_processed,
        report.total_bots
    )
}
