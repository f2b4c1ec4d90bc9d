//! # Operator control surface.
//!
//! A privileged bot session ([`ControlChannel`]) plus the command grammar
//! ([`Command`]) it speaks. The channel is the only place full credentials
//! are ever echoed back (the `gettoken` reverse lookup), and the only sender
//! it obeys is the configured admin.

mod channel;
mod command;

pub use channel::ControlChannel;
pub use command::Command;
