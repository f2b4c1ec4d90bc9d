//! Error types used by the fleet runtime.
//!
//! Three enums cover the failure taxonomy:
//!
//! - [`PlatformError`] — failures reported by the messaging-platform
//!   collaborator (auth, conflict, network).
//! - [`FleetError`] — failures of fleet-level operations (limit changes,
//!   duplicate registration, capacity estimation).
//! - [`BroadcastError`] — rejections when starting a broadcast job.
//!
//! Each type provides `as_label` for logs/metrics; [`PlatformError`]
//! additionally provides [`PlatformError::is_retryable`], which drives the
//! bounded retry policy: only `Conflict` is considered transient enough to
//! retry, everything else is abandoned immediately.

use thiserror::Error;

use crate::platform::Identity;

/// Errors reported by the messaging-platform collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    /// Credential is invalid or revoked. Never retried.
    #[error("authentication failed: {detail}")]
    Auth {
        /// Platform-supplied detail.
        detail: String,
    },

    /// Another consumer is mid-registration for the same credential.
    /// Retried a bounded number of times, then abandoned.
    #[error("registration conflict: {detail}")]
    Conflict {
        /// Platform-supplied detail.
        detail: String,
    },

    /// Transient network failure. Per-message failures are counted and the
    /// owning loop continues; a network failure from the long-poll call
    /// itself terminates that supervisor.
    #[error("network error: {detail}")]
    Network {
        /// Platform-supplied detail.
        detail: String,
    },
}

impl PlatformError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PlatformError::Auth { .. } => "platform_auth",
            PlatformError::Conflict { .. } => "platform_conflict",
            PlatformError::Network { .. } => "platform_network",
        }
    }

    /// Indicates whether the error is safe to retry.
    ///
    /// Only `Conflict` qualifies: auth failures are permanent and network
    /// failures at the resolution stage are not expected to clear within the
    /// bounded retry window.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Conflict { .. })
    }
}

/// Errors produced by fleet-level operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FleetError {
    /// Requested ceiling is below 1 or below the current registry size.
    /// The ceiling is left unchanged; attempted and current values are
    /// echoed back for reporting.
    #[error("invalid limit {requested}: must be >= 1 and >= {active} active bots (current limit {current_limit})")]
    InvalidLimit {
        /// The rejected ceiling value.
        requested: usize,
        /// The ceiling in effect at the time of the call.
        current_limit: usize,
        /// Registry size at the time of the call.
        active: usize,
    },

    /// A credential resolved to an identity that is already registered.
    /// Treated as an idempotent no-op by the launcher.
    #[error("identity @{identity} is already registered")]
    DuplicateIdentity {
        /// The already-registered identity.
        identity: Identity,
    },

    /// The host-metrics collaborator could not supply a sample.
    #[error("host metrics unavailable")]
    MetricsUnavailable,
}

impl FleetError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FleetError::InvalidLimit { .. } => "fleet_invalid_limit",
            FleetError::DuplicateIdentity { .. } => "fleet_duplicate_identity",
            FleetError::MetricsUnavailable => "fleet_metrics_unavailable",
        }
    }
}

/// Rejections returned when a broadcast job cannot start.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastError {
    /// A broadcast job is already running; concurrent jobs are rejected,
    /// never queued.
    #[error("a broadcast is already running")]
    AlreadyRunning,

    /// The registry holds no bots to broadcast through.
    #[error("no bots available for broadcast")]
    NoBots,
}

impl BroadcastError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BroadcastError::AlreadyRunning => "broadcast_already_running",
            BroadcastError::NoBots => "broadcast_no_bots",
        }
    }
}
