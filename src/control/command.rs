//! # Control-channel command grammar.
//!
//! Operator input arrives as ordinary inbound messages on the control bot.
//! Three shapes are recognized: slash commands, a `.txt` document upload
//! (credential ingestion), and a bare single-token paste. Anything else is
//! [`Command::Unknown`].
//!
//! Malformed arguments parse to the command with the argument absent; the
//! channel answers those with a usage line instead of rejecting the message.

use crate::platform::{Credential, DocumentRef, InboundMessage};
use crate::storage::{extract_credentials, is_single_credential};

/// One parsed operator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start`: help text.
    Start,
    /// `/stats`: fleet summary.
    Stats,
    /// `/capacity`: host capacity report.
    Capacity,
    /// `/setlimit <n>`: change the identity ceiling. `None` when the
    /// argument is missing or not a number.
    SetLimit(Option<usize>),
    /// `/bots [page]`: paginated listing, 1-based. A missing or malformed
    /// page reads as 1.
    Bots { page: usize },
    /// `/topbots`: busiest bots by message count.
    TopBots,
    /// `/gettoken <@identity>`: reverse credential lookup. `None` when the
    /// argument is missing.
    GetToken(Option<String>),
    /// `/broadcast <message>`: start a fan-out. `None` when the message body
    /// is missing.
    Broadcast(Option<String>),
    /// `/cancel`: request cancellation of the running broadcast.
    CancelBroadcast,
    /// A `.txt` document upload: credential ingestion.
    UploadTokens(DocumentRef),
    /// A bare message that is exactly one credential.
    InlineToken(Credential),
    /// Anything else.
    Unknown,
}

impl Command {
    /// Parses one inbound control message.
    pub fn parse(message: &InboundMessage) -> Command {
        if let Some(doc) = &message.document {
            if doc.is_text() {
                return Command::UploadTokens(doc.clone());
            }
            return Command::Unknown;
        }

        let Some(text) = message.text.as_deref() else {
            return Command::Unknown;
        };
        let text = text.trim();

        if !text.starts_with('/') {
            if is_single_credential(text) {
                let mut found = extract_credentials(text);
                // is_single_credential guarantees exactly one match
                if let Some(credential) = found.pop() {
                    return Command::InlineToken(credential);
                }
            }
            return Command::Unknown;
        }

        let (verb, rest) = match text.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (text, ""),
        };

        match verb {
            "/start" => Command::Start,
            "/stats" => Command::Stats,
            "/capacity" => Command::Capacity,
            "/setlimit" => Command::SetLimit(rest.parse::<usize>().ok()),
            "/bots" => Command::Bots {
                page: rest.parse::<usize>().ok().filter(|&p| p >= 1).unwrap_or(1),
            },
            "/topbots" => Command::TopBots,
            "/gettoken" => {
                let identity = rest.trim_start_matches('@');
                if identity.is_empty() {
                    Command::GetToken(None)
                } else {
                    Command::GetToken(Some(identity.to_string()))
                }
            }
            "/broadcast" => {
                if rest.is_empty() {
                    Command::Broadcast(None)
                } else {
                    Command::Broadcast(Some(rest.to_string()))
                }
            }
            "/cancel" => Command::CancelBroadcast,
            _ => Command::Unknown,
        }
    }
}
