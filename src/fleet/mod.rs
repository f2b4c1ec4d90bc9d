//! # Fleet orchestration core.
//!
//! The [`Fleet`] facade wires together the durable stores, the event bus and
//! its subscriber fan-out, admission control, the batched launcher, and the
//! broadcast engine. Build one with [`FleetBuilder`], launch credentials
//! through it, and cancel everything with [`Fleet::shutdown`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleetvisor::{Fleet, FleetConfig, LogWriter, NoNotify, Platform};
//!
//! async fn run(platform: Arc<dyn Platform>) -> std::io::Result<()> {
//!     let fleet = Fleet::builder(FleetConfig::default())
//!         .with_subscriber(Arc::new(LogWriter::default()))
//!         .build(platform)
//!         .await?;
//!
//!     let credentials = fleet.load_credentials().await;
//!     let summary = fleet.launch_batch(credentials, &NoNotify).await;
//!     tracing::info!(started = summary.started, "fleet up");
//!
//!     fleet.shutdown().await;
//!     Ok(())
//! }
//! ```

mod admission;
mod capacity;
mod launcher;
mod registry;
mod resolver;
mod stats;
mod supervisor;

pub use admission::{AdmissionController, LimitChange};
pub use capacity::{CapacityEstimator, CapacityReport, HostMetrics, HostSample, HostUsage};
pub use launcher::{FleetLauncher, LaunchSummary, NoNotify, Notify};
pub use registry::{BotEntry, FleetRegistry};
pub use resolver::IdentityResolver;
pub use stats::BotStats;
pub use supervisor::{BotSupervisor, SupervisorState};

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::config::FleetConfig;
use crate::events::{Bus, Event, EventKind};
use crate::platform::{Credential, Platform};
use crate::storage::{LimitStore, RecipientDirectory, TokenStore};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Fleet`].
pub struct FleetBuilder {
    config: FleetConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl FleetBuilder {
    /// Starts a builder over the given configuration.
    pub fn new(config: FleetConfig) -> Self {
        Self {
            config,
            subscribers: Vec::new(),
        }
    }

    /// Attaches an event subscriber (fanned out through a bounded queue).
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Loads the durable stores and assembles the fleet runtime.
    ///
    /// Fails only when the recipient directory file exists but cannot be
    /// read; every other store tolerates absence.
    pub async fn build(self, platform: Arc<dyn Platform>) -> std::io::Result<Fleet> {
        let config = self.config;
        let bus = Bus::new(config.bus_capacity_clamped());
        let runtime = CancellationToken::new();

        let tokens = TokenStore::new(config.token_files.clone(), config.overflow_file.clone());
        let directory = Arc::new(RecipientDirectory::load(config.recipients_file.clone()).await?);

        let limit_store = LimitStore::new(config.limit_file.clone());
        let limit = limit_store
            .load()
            .await
            .unwrap_or(config.default_limit.max(1));

        let registry = Arc::new(FleetRegistry::new());
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&registry),
            limit_store,
            bus.clone(),
            limit,
        ));

        let resolver = IdentityResolver::new(
            Arc::clone(&platform),
            config.resolve_retry,
            config.webhook_retry,
        );
        let launcher = FleetLauncher::new(
            Arc::clone(&platform),
            Arc::clone(&registry),
            Arc::clone(&admission),
            resolver,
            Arc::clone(&directory),
            tokens.clone(),
            bus.clone(),
            config.clone(),
            runtime.clone(),
        );
        let broadcaster = Broadcaster::new(
            Arc::clone(&platform),
            Arc::clone(&registry),
            bus.clone(),
            &config,
        );

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            Some(spawn_subscriber_listener(
                SubscriberSet::new(self.subscribers),
                &bus,
                runtime.clone(),
            ))
        };

        Ok(Fleet {
            platform,
            config,
            bus,
            runtime,
            tokens,
            directory,
            registry,
            admission,
            launcher,
            broadcaster,
            listener: Mutex::new(listener),
        })
    }
}

/// Forwards bus events into the subscriber fan-out until shutdown, then
/// drains what is left and closes the set.
fn spawn_subscriber_listener(
    set: SubscriberSet,
    bus: &Bus,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        set.shutdown().await;
    })
}

/// Assembled fleet runtime: stores, bus, admission, launcher, broadcaster.
pub struct Fleet {
    platform: Arc<dyn Platform>,
    config: FleetConfig,
    bus: Bus,
    runtime: CancellationToken,
    tokens: TokenStore,
    directory: Arc<RecipientDirectory>,
    registry: Arc<FleetRegistry>,
    admission: Arc<AdmissionController>,
    launcher: FleetLauncher,
    broadcaster: Broadcaster,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Fleet {
    /// Starts a [`FleetBuilder`].
    pub fn builder(config: FleetConfig) -> FleetBuilder {
        FleetBuilder::new(config)
    }

    /// Scans the configured token files for credentials.
    pub async fn load_credentials(&self) -> Vec<Credential> {
        self.tokens.load_all().await
    }

    /// Launches credentials under the admission ceiling (see
    /// [`FleetLauncher::launch_batch`]).
    pub async fn launch_batch(
        &self,
        credentials: Vec<Credential>,
        notifier: &dyn Notify,
    ) -> LaunchSummary {
        self.launcher.launch_batch(credentials, notifier).await
    }

    /// The messaging-platform collaborator.
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// The configuration this fleet was built with.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// The runtime event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The registry of running (and dead) bots.
    pub fn registry(&self) -> &Arc<FleetRegistry> {
        &self.registry
    }

    /// Admission control over the identity ceiling.
    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// The single-slot broadcast engine.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// The process-wide recipient directory.
    pub fn directory(&self) -> &Arc<RecipientDirectory> {
        &self.directory
    }

    /// The credential source files and overflow file.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Opens a control channel bound to this fleet (see
    /// [`ControlChannel::open`](crate::control::ControlChannel::open)).
    pub async fn control_channel<M: HostMetrics>(
        self: &Arc<Self>,
        credential: Credential,
        admin: crate::platform::RecipientId,
        metrics: M,
    ) -> Result<crate::control::ControlChannel<M>, crate::error::PlatformError> {
        crate::control::ControlChannel::open(Arc::clone(self), credential, admin, metrics).await
    }

    /// A child of the runtime cancellation token. Tie long-lived callers
    /// (the control channel loop) to it so [`Fleet::shutdown`] stops them
    /// too.
    pub fn child_token(&self) -> CancellationToken {
        self.runtime.child_token()
    }

    /// Cancels every supervisor and stops the subscriber fan-out.
    ///
    /// Shutdown is abrupt: in-flight polls are dropped at the next await
    /// point and each supervisor releases its session on the way out.
    pub async fn shutdown(&self) {
        self.bus.publish(Event::now(EventKind::ShutdownRequested));
        self.runtime.cancel();
        if let Some(listener) = self.listener.lock().await.take() {
            let _ = listener.await;
        }
    }
}
