//! Retry policy.
//!
//! The fleet retries exactly two operations — registration clearing and
//! identity resolution — and both use the same shape: a fixed number of
//! attempts with a fixed delay, applied only to error kinds the platform
//! reports as transient. [`RetryPolicy`] captures that shape once so the
//! bounds are not re-implemented inline at each call site.

mod retry;

pub use retry::RetryPolicy;
