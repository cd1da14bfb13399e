//! Core runtime controller for vireo.
//!
//! Coordinates filesystem change notifications, inbound control messages
//! and script engine errors into one consistent script lifecycle. The
//! [`ScriptSession`] is the single source of truth for which script is
//! active and how healthy it is; the [`EventRouter`] drains the event
//! sources in a fixed order once per tick and requests transitions on
//! the session.

pub mod protocol;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use protocol::Command;
pub use router::{EventRouter, WatchMode};
pub use session::{ErrorPolicy, Flow, Health, ScriptSession, SessionError};
