//! Event vocabulary shared across the vireo crates.
//!
//! Defines the two inbound event streams the controller drains each tick
//! (filesystem change events and control messages) plus the source traits
//! the event router consumes them through. Implementations live in
//! vireo-watch and vireo-control; the core depends only on this crate.

pub mod change_events;
pub mod control_messages;
pub mod sources;

pub use change_events::{ChangeKind, PathChangeEvent};
pub use control_messages::{ControlMessage, ControlValue};
pub use sources::{ChangeSource, MessageSource};
