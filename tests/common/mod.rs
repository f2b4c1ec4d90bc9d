//! Shared test doubles: an in-memory platform, fixed host metrics, and a
//! recording notifier.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify as TaskNotify};

use fleetvisor::{
    BotHandle, Credential, DocumentRef, HostMetrics, HostSample, HostUsage, Identity,
    InboundMessage, MessageId, Notify, Platform, PlatformError, RecipientId,
};

/// One scripted long-poll result.
pub enum Inbound {
    Message(InboundMessage),
    Fail(PlatformError),
}

#[derive(Default)]
struct State {
    /// token -> identity
    identities: HashMap<String, String>,
    /// tokens whose resolution fails permanently
    auth_failures: HashSet<String>,
    /// token -> remaining Conflict failures before resolution succeeds
    conflicts: HashMap<String, u32>,
    /// identity -> scripted long-poll results
    inboxes: HashMap<String, VecDeque<Inbound>>,
    /// identity -> wakeup for a poller waiting on an empty inbox
    wakeups: HashMap<String, Arc<TaskNotify>>,
    /// (identity, recipient) pairs whose next send fails (one-shot)
    send_failures: HashSet<(String, i64)>,
    /// file_id -> document content
    documents: HashMap<String, String>,

    sent: Vec<(String, i64, String)>,
    sent_documents: Vec<(i64, PathBuf, String)>,
    edits: Vec<(i64, String)>,
    cleared: Vec<String>,
    closed: Vec<String>,
    next_message_id: i64,
}

/// In-memory [`Platform`] with scriptable failures and full call recording.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `token` resolve to `identity`.
    pub async fn register(&self, token: &str, identity: &str) {
        let mut st = self.state.lock().await;
        st.identities.insert(token.to_string(), identity.to_string());
    }

    /// Makes `token` fail resolution permanently.
    pub async fn fail_auth(&self, token: &str) {
        self.state.lock().await.auth_failures.insert(token.to_string());
    }

    /// Makes the next `n` resolutions of `token` fail with `Conflict`.
    pub async fn fail_conflicts(&self, token: &str, n: u32) {
        self.state.lock().await.conflicts.insert(token.to_string(), n);
    }

    /// Scripts an inbound text message for `identity`.
    pub async fn push_message(&self, identity: &str, sender: i64, text: &str) {
        self.push(
            identity,
            Inbound::Message(InboundMessage {
                sender: RecipientId(sender),
                message_id: MessageId(0),
                text: Some(text.to_string()),
                document: None,
            }),
        )
        .await;
    }

    /// Scripts an inbound document upload for `identity`.
    pub async fn push_document(&self, identity: &str, sender: i64, doc: DocumentRef) {
        self.push(
            identity,
            Inbound::Message(InboundMessage {
                sender: RecipientId(sender),
                message_id: MessageId(0),
                text: None,
                document: Some(doc),
            }),
        )
        .await;
    }

    /// Scripts a fatal long-poll failure for `identity`.
    pub async fn push_poll_failure(&self, identity: &str) {
        self.push(
            identity,
            Inbound::Fail(PlatformError::Network {
                detail: "connection reset".to_string(),
            }),
        )
        .await;
    }

    async fn push(&self, identity: &str, inbound: Inbound) {
        let mut st = self.state.lock().await;
        st.inboxes
            .entry(identity.to_string())
            .or_default()
            .push_back(inbound);
        if let Some(wakeup) = st.wakeups.get(identity) {
            wakeup.notify_one();
        }
    }

    /// Makes the next send from `identity` to `recipient` fail (one-shot).
    pub async fn fail_send(&self, identity: &str, recipient: i64) {
        self.state
            .lock()
            .await
            .send_failures
            .insert((identity.to_string(), recipient));
    }

    /// Stores downloadable document content under `file_id`.
    pub async fn put_document(&self, file_id: &str, content: &str) {
        let mut st = self.state.lock().await;
        st.documents.insert(file_id.to_string(), content.to_string());
    }

    pub async fn sent(&self) -> Vec<(String, i64, String)> {
        self.state.lock().await.sent.clone()
    }

    pub async fn sent_documents(&self) -> Vec<(i64, PathBuf, String)> {
        self.state.lock().await.sent_documents.clone()
    }

    pub async fn edits(&self) -> Vec<(i64, String)> {
        self.state.lock().await.edits.clone()
    }

    pub async fn cleared(&self) -> Vec<String> {
        self.state.lock().await.cleared.clone()
    }

    pub async fn closed(&self) -> Vec<String> {
        self.state.lock().await.closed.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn clear_push_registration(&self, credential: &Credential) -> Result<(), PlatformError> {
        let mut st = self.state.lock().await;
        st.cleared.push(credential.reveal().to_string());
        Ok(())
    }

    async fn resolve_identity(&self, credential: &Credential) -> Result<Identity, PlatformError> {
        let token = credential.reveal().to_string();
        let mut st = self.state.lock().await;
        if st.auth_failures.contains(&token) {
            return Err(PlatformError::Auth {
                detail: "token revoked".to_string(),
            });
        }
        if let Some(remaining) = st.conflicts.get_mut(&token) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PlatformError::Conflict {
                    detail: "registration in progress".to_string(),
                });
            }
        }
        match st.identities.get(&token) {
            Some(identity) => Ok(Identity::new(identity.clone())),
            None => Err(PlatformError::Auth {
                detail: "unknown token".to_string(),
            }),
        }
    }

    async fn open_session(&self, credential: &Credential) -> Result<BotHandle, PlatformError> {
        let identity = self.resolve_identity(credential).await?;
        Ok(BotHandle::new(credential.clone(), identity))
    }

    async fn receive_next_message(
        &self,
        handle: &BotHandle,
    ) -> Result<InboundMessage, PlatformError> {
        let identity = handle.identity().as_str().to_string();
        loop {
            let wakeup = {
                let mut st = self.state.lock().await;
                if let Some(inbound) = st.inboxes.get_mut(&identity).and_then(|q| q.pop_front()) {
                    return match inbound {
                        Inbound::Message(m) => Ok(m),
                        Inbound::Fail(e) => Err(e),
                    };
                }
                Arc::clone(st.wakeups.entry(identity.clone()).or_default())
            };
            wakeup.notified().await;
        }
    }

    async fn send_message(
        &self,
        handle: &BotHandle,
        recipient: RecipientId,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        let identity = handle.identity().as_str().to_string();
        let mut st = self.state.lock().await;
        if st.send_failures.remove(&(identity.clone(), recipient.0)) {
            return Err(PlatformError::Network {
                detail: "send failed".to_string(),
            });
        }
        st.sent.push((identity, recipient.0, text.to_string()));
        st.next_message_id += 1;
        Ok(MessageId(st.next_message_id))
    }

    async fn send_document(
        &self,
        _handle: &BotHandle,
        recipient: RecipientId,
        file: &Path,
        caption: &str,
    ) -> Result<MessageId, PlatformError> {
        let mut st = self.state.lock().await;
        st.sent_documents
            .push((recipient.0, file.to_path_buf(), caption.to_string()));
        st.next_message_id += 1;
        Ok(MessageId(st.next_message_id))
    }

    async fn edit_message(
        &self,
        _handle: &BotHandle,
        _chat: RecipientId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut st = self.state.lock().await;
        st.edits.push((message_id.0, text.to_string()));
        Ok(())
    }

    async fn fetch_document(
        &self,
        _handle: &BotHandle,
        document: &DocumentRef,
    ) -> Result<String, PlatformError> {
        let st = self.state.lock().await;
        st.documents
            .get(&document.file_id)
            .cloned()
            .ok_or_else(|| PlatformError::Network {
                detail: "document not found".to_string(),
            })
    }

    async fn close_session(&self, handle: &BotHandle) {
        let mut st = self.state.lock().await;
        st.closed.push(handle.identity().as_str().to_string());
    }
}

/// Fixed host metrics for capacity reports.
pub struct FixedMetrics {
    pub sample: Option<HostSample>,
}

impl HostMetrics for FixedMetrics {
    fn sample(&self) -> Option<HostSample> {
        self.sample
    }

    fn usage(&self) -> Option<HostUsage> {
        Some(HostUsage {
            cpu_pct: 12.0,
            ram_pct: 34.0,
            disk_pct: 56.0,
        })
    }
}

/// Notifier that records everything it is handed.
#[derive(Default)]
pub struct RecordingNotify {
    pub texts: Mutex<Vec<String>>,
    pub documents: Mutex<Vec<(PathBuf, String)>>,
}

#[async_trait]
impl Notify for RecordingNotify {
    async fn text(&self, text: &str) {
        self.texts.lock().await.push(text.to_string());
    }

    async fn document(&self, file: &Path, caption: &str) {
        self.documents
            .lock()
            .await
            .push((file.to_path_buf(), caption.to_string()));
    }
}

/// Routes the crate's `tracing` output through the test harness so failures
/// can be diagnosed with `RUST_LOG`. Safe to call from every test; only the
/// first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fleet config with every durable file rooted in `dir`.
pub fn config_in(dir: &Path) -> fleetvisor::FleetConfig {
    init_tracing();
    let mut config = fleetvisor::FleetConfig::default();
    config.token_files = vec![dir.join("token1.txt")];
    config.recipients_file = dir.join("user_ids.txt");
    config.limit_file = dir.join("bot_config.txt");
    config.overflow_file = dir.join("remaining_tokens.txt");
    config
}

/// A valid-looking credential for `tag` (tag must be alphanumeric).
pub fn token(tag: &str) -> String {
    format!("1234567:{tag:A<24}")
}
