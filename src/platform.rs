//! # Messaging-platform collaborator boundary.
//!
//! Everything the fleet needs from the shared platform API is expressed as
//! the [`Platform`] trait plus a handful of value types. The runtime never
//! talks to the network directly, which keeps the orchestration engine
//! testable with an in-memory fake.
//!
//! ## Capability contract
//! - `clear_push_registration`: drop any stale webhook so long-poll can be
//!   used exclusively.
//! - `resolve_identity`: credential → public handle.
//! - `open_session`: bind a live session ([`BotHandle`]) to a credential.
//! - `receive_next_message`: blocking long-poll for the next inbound message.
//! - `send_message` / `send_document` / `edit_message`: outbound surface.
//! - `fetch_document`: download an uploaded text blob (credential ingestion).
//! - `close_session`: release the session; called exactly once per handle via
//!   [`BotHandle::close`].

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformError;

/// Opaque authentication token for one bot identity.
///
/// Immutable once extracted. `Debug` and `Display` never reveal the full
/// token; use [`Credential::prefix`] to correlate log lines.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Full token text. Only the control channel's `gettoken` reverse lookup
    /// and the platform adapter should need this.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// First 10 characters, for log correlation.
    pub fn prefix(&self) -> String {
        let end = self
            .0
            .char_indices()
            .nth(10)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        format!("{}…", &self.0[..end])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.prefix())
    }
}

/// A resolved, publicly addressable bot handle. Registry key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    pub fn new(handle: impl Into<Arc<str>>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform-assigned id of a message recipient (chat peer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-assigned id of a sent message, used for later edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// Reference to a document attached to an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    /// Platform file id used to fetch the content.
    pub file_id: String,
    /// Original file name as uploaded.
    pub file_name: String,
}

impl DocumentRef {
    /// True if the upload looks like a plain-text credential blob.
    pub fn is_text(&self) -> bool {
        self.file_name.ends_with(".txt")
    }
}

/// One inbound message delivered by the long-poll.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Sender of the message (also the reply target).
    pub sender: RecipientId,
    /// Id of this message.
    pub message_id: MessageId,
    /// Text content, if any.
    pub text: Option<String>,
    /// Attached document, if any.
    pub document: Option<DocumentRef>,
}

struct HandleInner {
    credential: Credential,
    identity: Identity,
    closed: AtomicBool,
}

/// Live session bound to one identity.
///
/// Cheap to clone (`Arc` inner); the owning supervisor is responsible for
/// releasing it, and [`BotHandle::close`] guarantees the platform sees the
/// release exactly once no matter how many clones exist.
#[derive(Clone)]
pub struct BotHandle {
    inner: Arc<HandleInner>,
}

impl BotHandle {
    /// Creates a handle binding `credential` to its resolved `identity`.
    ///
    /// Normally called by the platform adapter inside
    /// [`Platform::open_session`].
    pub fn new(credential: Credential, identity: Identity) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                credential,
                identity,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The credential this session authenticates as.
    pub fn credential(&self) -> &Credential {
        &self.inner.credential
    }

    /// The identity this session is bound to.
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    /// Releases the session. Idempotent: only the first call reaches the
    /// platform, later calls are no-ops.
    pub async fn close(&self, platform: &dyn Platform) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        platform.close_session(self).await;
    }

    /// True once [`BotHandle::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotHandle")
            .field("identity", &self.inner.identity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Capability contract consumed from the shared messaging platform.
///
/// All methods suspend at network I/O; `receive_next_message` suspends
/// indefinitely until the next inbound message arrives (long-poll).
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Idempotently clears any previous push-delivery (webhook) registration
    /// for the credential so long-poll can be used exclusively.
    async fn clear_push_registration(&self, credential: &Credential) -> Result<(), PlatformError>;

    /// Resolves the public handle for the credential.
    async fn resolve_identity(&self, credential: &Credential) -> Result<Identity, PlatformError>;

    /// Opens a live session for the credential.
    async fn open_session(&self, credential: &Credential) -> Result<BotHandle, PlatformError>;

    /// Long-poll: suspends until the next inbound message for `handle`.
    async fn receive_next_message(
        &self,
        handle: &BotHandle,
    ) -> Result<InboundMessage, PlatformError>;

    /// Sends a text message, returning the id of the sent message.
    async fn send_message(
        &self,
        handle: &BotHandle,
        recipient: RecipientId,
        text: &str,
    ) -> Result<MessageId, PlatformError>;

    /// Sends a file with a caption.
    async fn send_document(
        &self,
        handle: &BotHandle,
        recipient: RecipientId,
        file: &Path,
        caption: &str,
    ) -> Result<MessageId, PlatformError>;

    /// Edits a previously sent message in place.
    async fn edit_message(
        &self,
        handle: &BotHandle,
        chat: RecipientId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), PlatformError>;

    /// Downloads the content of an uploaded document as text.
    async fn fetch_document(
        &self,
        handle: &BotHandle,
        document: &DocumentRef,
    ) -> Result<String, PlatformError>;

    /// Releases a session. Invoked through [`BotHandle::close`], which
    /// guarantees at-most-once delivery.
    async fn close_session(&self, handle: &BotHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("123456789:AAAAAAAAAAAAAAAAAAAAAAAA");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("123456789:"));
        assert!(!dbg.contains("AAAAAAAAAAAAAAAAAAAAAAAA"));
    }

    #[test]
    fn credential_prefix_handles_short_tokens() {
        let c = Credential::new("short");
        assert_eq!(c.prefix(), "short…");
    }
}
