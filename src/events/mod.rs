//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the launcher, the per-bot
//! supervisors, the admission controller, and the broadcast engine.
//!
//! ## Quick reference
//! - **Publishers**: `FleetLauncher`, `BotSupervisor`, `AdmissionController`,
//!   `Broadcaster`.
//! - **Consumers**: the fleet's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::subscribers::SubscriberSet)) and the control
//!   channel's broadcast-progress listener.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
