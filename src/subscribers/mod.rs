//! # Event subscribers.
//!
//! The [`Subscribe`] trait is the extension point for observing runtime
//! events; [`SubscriberSet`] fans each event out to every subscriber through
//! a dedicated worker with a bounded queue, so a slow subscriber never blocks
//! publishers or its peers. [`LogWriter`] is the built-in subscriber that
//! renders events through `tracing`.

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
