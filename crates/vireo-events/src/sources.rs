use std::path::{Path, PathBuf};

use crate::change_events::PathChangeEvent;
use crate::control_messages::ControlMessage;

/// Source of filesystem change events plus the watch set it observes.
///
/// Implementations buffer events from background threads into a
/// thread-safe queue; `drain` returns whatever is queued right now and
/// never blocks. Watch-set mutation failures are logged by the
/// implementation rather than surfaced, so router bookkeeping stays
/// infallible.
pub trait ChangeSource {
    /// Take every event queued so far, in arrival order.
    fn drain(&mut self) -> Vec<PathChangeEvent>;

    /// Add a path to the watch set (no-op if already watched).
    fn add_path(&mut self, path: &Path);

    /// Clear the watch set.
    fn remove_all_paths(&mut self);

    /// Currently watched paths, in insertion order.
    fn watched(&self) -> &[PathBuf];
}

/// Source of inbound control messages.
///
/// Same contract as [`ChangeSource::drain`]: non-blocking, returns what is
/// queued at the time of the call.
pub trait MessageSource {
    fn drain(&mut self) -> Vec<ControlMessage>;
}
