//! UDP control channel for vireo.
//!
//! Messages are OSC-style datagrams: a padded address string, a
//! comma-prefixed type tag string, then big-endian arguments. The
//! [`ControlListener`] buffers decoded inbound messages on a background
//! task so the event router can drain them non-blockingly each tick; the
//! [`ControlSender`] is the reconfigurable outbound endpoint offered to
//! scripts.

pub mod codec;
pub mod listener;
pub mod sender;

pub use codec::{decode, encode, DecodeError};
pub use listener::ControlListener;
pub use sender::ControlSender;
