//! # Event subscriber trait.
//!
//! Each subscriber gets a dedicated worker task and a per-subscriber bounded
//! queue. Panics inside a subscriber are caught by the worker and logged;
//! other subscribers are unaffected.
//!
//! ## Overflow behavior
//! When a subscriber's queue is full, the new event is dropped **for that
//! subscriber only** and a warning is logged.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use fleetvisor::{Event, EventKind, Subscribe};
//!
//! struct TerminationCounter;
//!
//! #[async_trait]
//! impl Subscribe for TerminationCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::BotTerminated) {
//!             // bump a metric, page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "termination-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, never in the publisher context.
    /// Events are delivered in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic logs.
    ///
    /// Prefer short, descriptive names. The default uses
    /// `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber
    /// (clamped to a minimum of 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
