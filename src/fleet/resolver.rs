//! # Identity resolution.
//!
//! [`IdentityResolver`] prepares a credential for long-polling: it clears
//! any stale push-delivery registration, then resolves the credential's
//! public handle.
//!
//! Both steps retry only on `Conflict` (another consumer mid-registration),
//! with the bounds coming from [`FleetConfig`](crate::FleetConfig):
//! - registration clear: one extra attempt, then give up silently — the
//!   subsequent resolve will surface persistent problems;
//! - resolve: 3 attempts, fixed delay; any non-conflict failure returns
//!   immediately since it is not expected to be transient.

use std::sync::Arc;

use crate::error::PlatformError;
use crate::platform::{Credential, Identity, Platform};
use crate::policies::RetryPolicy;

/// Clears stale registrations and resolves identities, with bounded retry.
pub struct IdentityResolver {
    platform: Arc<dyn Platform>,
    resolve_retry: RetryPolicy,
    webhook_retry: RetryPolicy,
}

impl IdentityResolver {
    pub fn new(
        platform: Arc<dyn Platform>,
        resolve_retry: RetryPolicy,
        webhook_retry: RetryPolicy,
    ) -> Self {
        Self {
            platform,
            resolve_retry,
            webhook_retry,
        }
    }

    /// Idempotently clears any previous push-delivery registration so
    /// long-poll can be used exclusively. Failures are logged, never fatal.
    pub async fn clear_stale_registration(&self, credential: &Credential) {
        let res = self
            .webhook_retry
            .run(|| self.platform.clear_push_registration(credential))
            .await;
        if let Err(e) = res {
            tracing::warn!(
                credential = %credential.prefix(),
                error = e.as_label(),
                "failed to clear push registration, continuing"
            );
        }
    }

    /// Resolves the credential's public handle. Retries on `Conflict` only.
    pub async fn resolve(&self, credential: &Credential) -> Result<Identity, PlatformError> {
        self.resolve_retry
            .run(|| self.platform.resolve_identity(credential))
            .await
    }
}
