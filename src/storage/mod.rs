//! Durable state collaborators.
//!
//! Three small file-backed stores, each loaded at startup and written on
//! change:
//! - [`TokenStore`] — credential source files plus the overflow file
//!   (overwritten in full on every spillover).
//! - [`RecipientDirectory`] — append-only set of every recipient id ever
//!   seen across all bots.
//! - [`LimitStore`] — the identity ceiling, a single integer overwritten in
//!   full on every change.
//!
//! All stores are tolerant: a missing file reads as empty, and write errors
//! are surfaced as `io::Result` for the caller to log (persistence failures
//! are never fatal to the fleet).

mod limits;
mod recipients;
mod tokens;

pub use limits::LimitStore;
pub use recipients::RecipientDirectory;
pub use tokens::{extract_credentials, is_single_credential, TokenStore};
