//! Filesystem watcher for the active script path(s).
//!
//! Wraps a `notify` watcher behind the [`ChangeSource`] trait: change
//! notifications arrive on a background OS thread, get buffered into a
//! channel, and the event router drains whatever is queued once per tick.
//! The watcher only observes paths after [`PathWatcher::start`]; paths
//! added earlier are registered retroactively, so watching can stay
//! disabled (`--no-watch`) without changing any bookkeeping.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, warn};

use vireo_events::{ChangeKind, ChangeSource, PathChangeEvent};

/// Watches an ordered set of unique paths and queues their change events.
pub struct PathWatcher {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    watched: Vec<PathBuf>,
}

impl PathWatcher {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            watcher: None,
            tx,
            rx,
            watched: Vec::new(),
        }
    }

    /// Begin observing the filesystem. Paths added before this call are
    /// registered now; paths added later are registered as they come in.
    pub fn start(&mut self) -> Result<(), notify::Error> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let tx = self.tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Err(e) = tx.send(event) {
                        error!(target: "watch", "failed to queue change event: {e}");
                    }
                }
                Err(e) => {
                    error!(target: "watch", "filesystem watcher error: {e}");
                }
            }
        })?;

        for path in &self.watched {
            if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                warn!(target: "watch", "cannot watch {}: {e}", path.display());
            }
        }

        self.watcher = Some(watcher);
        debug!(target: "watch", "path watching started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Default for PathWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for PathWatcher {
    fn drain(&mut self) -> Vec<PathChangeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            for change in map_event(&event) {
                // Coalesce immediate duplicates (editors often emit bursts
                // of identical modify events for a single save).
                if events.last() == Some(&change) {
                    continue;
                }
                events.push(change);
            }
        }
        events
    }

    fn add_path(&mut self, path: &Path) {
        if self.watched.iter().any(|p| p == path) {
            return;
        }
        if let Some(watcher) = &mut self.watcher {
            if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                warn!(target: "watch", "cannot watch {}: {e}", path.display());
            }
        }
        debug!(target: "watch", "watching {}", path.display());
        self.watched.push(path.to_path_buf());
    }

    fn remove_all_paths(&mut self) {
        if let Some(watcher) = &mut self.watcher {
            for path in &self.watched {
                if let Err(e) = watcher.unwatch(path) {
                    debug!(target: "watch", "unwatch {}: {e}", path.display());
                }
            }
        }
        self.watched.clear();
    }

    fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Map a notify event into zero or more path change events.
fn map_event(event: &Event) -> Vec<PathChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => ChangeKind::None,
    };

    event
        .paths
        .iter()
        .map(|path| PathChangeEvent::new(path.clone(), kind))
        .collect()
}
