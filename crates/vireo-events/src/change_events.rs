use std::path::PathBuf;

/// Kind of filesystem change reported for a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path was created
    Created,
    /// Path contents were modified
    Modified,
    /// Path was removed
    Deleted,
    /// Uninteresting change (metadata, access, etc.)
    None,
}

/// A single coalesced change notification for a watched path.
///
/// Produced by the path watcher and consumed exactly once by the event
/// router when it drains the watcher queue at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl PathChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
