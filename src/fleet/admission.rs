//! # Admission control.
//!
//! [`AdmissionController`] owns the configured identity ceiling and gates how
//! many bots may be registered. It never mutates the registry itself;
//! callers must claim the slots they were granted before yielding to another
//! launch, which holds because a single orchestrating task (the launcher)
//! performs all admission checks and insertions.
//!
//! The ceiling is durable: every successful [`set_limit`] overwrites the
//! limit file (persist failures are logged, never fatal).
//!
//! [`set_limit`]: AdmissionController::set_limit

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::FleetError;
use crate::events::{Bus, Event, EventKind};
use crate::fleet::registry::FleetRegistry;
use crate::storage::LimitStore;

/// Result of a successful ceiling change, echoed back for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitChange {
    pub old: usize,
    pub new: usize,
}

/// Owns the identity ceiling and grants launch slots.
pub struct AdmissionController {
    registry: Arc<FleetRegistry>,
    store: LimitStore,
    bus: Bus,
    limit: AtomicUsize,
}

impl AdmissionController {
    /// Creates a controller with the given starting ceiling (the caller
    /// loads it from the [`LimitStore`] or falls back to the config default).
    pub fn new(registry: Arc<FleetRegistry>, store: LimitStore, bus: Bus, limit: usize) -> Self {
        Self {
            registry,
            store,
            bus,
            limit: AtomicUsize::new(limit.max(1)),
        }
    }

    /// The ceiling currently in effect.
    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Slots currently available: `ceiling - registry size`, clamped to 0.
    pub async fn available(&self) -> usize {
        self.limit().saturating_sub(self.registry.len().await)
    }

    /// Grants `min(n, available)` slots. The caller must claim them before
    /// yielding control to any other launch; no lock is held between this
    /// check and the claim.
    pub async fn request_slots(&self, n: usize) -> usize {
        n.min(self.available().await)
    }

    /// Updates the ceiling.
    ///
    /// Fails with [`FleetError::InvalidLimit`] when `new_limit < 1` or when
    /// it is below the current registry size; the ceiling is unchanged in
    /// that case. On success the new value is persisted and a
    /// [`EventKind::LimitChanged`] event is published.
    pub async fn set_limit(&self, new_limit: usize) -> Result<LimitChange, FleetError> {
        let active = self.registry.len().await;
        let current_limit = self.limit();
        if new_limit < 1 || new_limit < active {
            return Err(FleetError::InvalidLimit {
                requested: new_limit,
                current_limit,
                active,
            });
        }

        let old = self.limit.swap(new_limit, Ordering::Relaxed);
        if let Err(e) = self.store.save(new_limit).await {
            tracing::warn!(limit = new_limit, error = %e, "failed to persist bot limit");
        }
        self.bus.publish(
            Event::now(EventKind::LimitChanged).with_reason(format!("{old} -> {new_limit}")),
        );
        Ok(LimitChange {
            old,
            new: new_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::stats::BotStats;
    use crate::platform::{BotHandle, Credential, Identity};

    async fn occupy(registry: &FleetRegistry, n: usize) {
        for i in 0..n {
            let name = format!("bot{i}");
            registry
                .insert(
                    Identity::new(name.clone()),
                    BotHandle::new(
                        Credential::new(format!("1234567:{name}AAAAAAAAAAAAAAAAAAAA")),
                        Identity::new(name),
                    ),
                    Arc::new(BotStats::new()),
                )
                .await
                .unwrap();
        }
    }

    fn controller(registry: Arc<FleetRegistry>, limit: usize) -> AdmissionController {
        let dir = tempfile::tempdir().unwrap();
        let store = LimitStore::new(dir.path().join("limit.txt"));
        // Leak the tempdir so the store path outlives the test body.
        std::mem::forget(dir);
        AdmissionController::new(registry, store, Bus::new(16), limit)
    }

    #[tokio::test]
    async fn request_slots_clamps_to_available() {
        let registry = Arc::new(FleetRegistry::new());
        occupy(&registry, 3).await;
        let admission = controller(Arc::clone(&registry), 5);

        assert_eq!(admission.available().await, 2);
        assert_eq!(admission.request_slots(10).await, 2);
        assert_eq!(admission.request_slots(1).await, 1);
    }

    #[tokio::test]
    async fn set_limit_rejects_below_occupancy_and_zero() {
        let registry = Arc::new(FleetRegistry::new());
        occupy(&registry, 3).await;
        let admission = controller(Arc::clone(&registry), 5);

        let err = admission.set_limit(2).await.unwrap_err();
        assert!(matches!(
            err,
            FleetError::InvalidLimit {
                requested: 2,
                current_limit: 5,
                active: 3,
            }
        ));
        assert_eq!(admission.limit(), 5);

        assert!(admission.set_limit(0).await.is_err());
        assert_eq!(admission.limit(), 5);
    }

    #[tokio::test]
    async fn set_limit_updates_and_reports_old_and_new() {
        let registry = Arc::new(FleetRegistry::new());
        let admission = controller(registry, 100);

        let change = admission.set_limit(250).await.unwrap();
        assert_eq!(change, LimitChange { old: 100, new: 250 });
        assert_eq!(admission.limit(), 250);
    }
}
