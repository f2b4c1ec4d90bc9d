//! # fleetvisor
//!
//! Supervision engine for a fleet of chat bots sharing one host and one
//! messaging platform: admission control over how many identities may run,
//! batched launch with backpressure, a supervised long-poll loop per
//! identity, cancellable broadcast fan-out, and a privileged control channel
//! for the operator.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌────────────────────────────────────────────┐
//!                  │               ControlChannel               │
//!                  │   (admin-only command session: /stats,     │
//!                  │    /setlimit, /broadcast, token uploads)   │
//!                  └──────┬──────────────┬──────────────┬───────┘
//!                         │              │              │
//!                  launch_batch      set_limit        run/cancel
//!                         ▼              ▼              ▼
//!  TokenStore ──► FleetLauncher ─► AdmissionController  Broadcaster
//!                     │   claims slots, resolves,          │
//!                     │   registers, spawns                │ snapshots
//!                     ▼                                    ▼
//!               FleetRegistry ◄──────────────────── registry order
//!                     │
//!            one BotSupervisor per identity
//!                     │  long-poll ─► reply ─► BotStats
//!                     ▼
//!            RecipientDirectory (durable, append-only)
//!
//!  every component ──► Bus ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ## Core pieces
//!
//! - [`Platform`] — capability trait for the messaging platform; the engine
//!   never touches the network directly.
//! - [`Fleet`] / [`FleetBuilder`] — wiring: stores, bus, admission,
//!   launcher, broadcaster, shutdown token.
//! - [`FleetRegistry`] — insertion-ordered identity → bot map; entries are
//!   never removed, dead supervisors stay visible.
//! - [`AdmissionController`] — durable identity ceiling, slot grants.
//! - [`FleetLauncher`] — batched launch with a fixed pause between
//!   sub-batches and overflow spillover to disk.
//! - [`BotSupervisor`] — per-identity poll loop; fatal poll failures
//!   terminate the supervisor without restart.
//! - [`Broadcaster`] — at-most-one fan-out job over per-bot recipient
//!   snapshots, cancellable between sends.
//! - [`ControlChannel`] — the operator surface, bound to a single admin.
//! - [`Bus`] / [`Subscribe`] / [`SubscriberSet`] — runtime events and
//!   non-blocking observer fan-out.

mod broadcast;
mod config;
mod control;
mod error;
mod events;
mod fleet;
mod platform;
mod policies;
mod storage;
mod subscribers;

pub use broadcast::{BroadcastOutcome, BroadcastReport, Broadcaster};
pub use config::FleetConfig;
pub use control::{Command, ControlChannel};
pub use error::{BroadcastError, FleetError, PlatformError};
pub use events::{Bus, Event, EventKind};
pub use fleet::{
    AdmissionController, BotEntry, BotStats, BotSupervisor, CapacityEstimator, CapacityReport,
    Fleet, FleetBuilder, FleetLauncher, FleetRegistry, HostMetrics, HostSample, HostUsage,
    IdentityResolver, LaunchSummary, LimitChange, NoNotify, Notify, SupervisorState,
};
pub use platform::{
    BotHandle, Credential, DocumentRef, Identity, InboundMessage, MessageId, Platform,
    RecipientId,
};
pub use policies::RetryPolicy;
pub use storage::{
    extract_credentials, is_single_credential, LimitStore, RecipientDirectory, TokenStore,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
