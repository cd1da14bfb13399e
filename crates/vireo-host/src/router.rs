//! Per-tick event routing.
//!
//! Runs once per scheduler tick and drains the two inbound queues in a
//! fixed order: filesystem events first, then control messages, then the
//! session's delayed-reload check, then the per-tick update callback.
//! Filesystem truth must not be shadowed by a stale in-flight command from
//! the same tick, which is why the order is fixed.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use vireo_engine::{is_loadable_path, ScriptEngine};
use vireo_events::{ChangeKind, ChangeSource, MessageSource};

use crate::protocol::{self, Command};
use crate::session::{Flow, ScriptSession};

/// How the watch set reacts to a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Watch only the active script (default).
    ReplaceOnLoad,
    /// Keep watching every previously loaded script path.
    Accumulate,
}

/// Drives the script session from the watcher and control channel queues.
///
/// The session is exclusively owned and mutated here; other components
/// only request operations on it.
pub struct EventRouter<E, W, M>
where
    E: ScriptEngine,
    W: ChangeSource,
    M: MessageSource,
{
    session: ScriptSession<E>,
    watcher: W,
    messages: M,
    namespace: String,
    watch_mode: WatchMode,
    last_tick: Option<Instant>,
}

impl<E, W, M> EventRouter<E, W, M>
where
    E: ScriptEngine,
    W: ChangeSource,
    M: MessageSource,
{
    pub fn new(
        session: ScriptSession<E>,
        watcher: W,
        messages: M,
        namespace: impl Into<String>,
        watch_mode: WatchMode,
    ) -> Self {
        Self {
            session,
            watcher,
            messages,
            namespace: namespace.into(),
            watch_mode,
            last_tick: None,
        }
    }

    pub fn session(&self) -> &ScriptSession<E> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ScriptSession<E> {
        &mut self.session
    }

    /// Load a script and update the watch set. Used for the initial
    /// startup load and for every load requested by an event. An invalid
    /// path is logged and dropped so one bad event never stalls a batch.
    pub fn load(&mut self, path: &Path, args: Vec<String>, now: Instant) -> Flow {
        match self.session.load(path, args, now) {
            Ok(flow) => {
                match self.watch_mode {
                    WatchMode::ReplaceOnLoad => {
                        self.watcher.remove_all_paths();
                        self.watcher.add_path(path);
                    }
                    WatchMode::Accumulate => self.watcher.add_path(path),
                }
                flow
            }
            Err(e) => {
                warn!(target: "router", "load rejected: {e}");
                Flow::Continue
            }
        }
    }

    /// Run one tick: drain filesystem events, drain control messages,
    /// fire any due auto-reload, then update the script.
    pub fn tick(&mut self, now: Instant) -> Flow {
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_tick = Some(now);

        let mut flow = Flow::Continue;

        for event in self.watcher.drain() {
            match event.kind {
                ChangeKind::Created | ChangeKind::Modified => {
                    debug!(
                        target: "router",
                        "path {}: {:?}",
                        event.path.display(),
                        event.kind
                    );
                    if is_loadable_path(&event.path) {
                        let args = self.session.args().to_vec();
                        flow = flow.and(self.load(&event.path, args, now));
                    }
                }
                ChangeKind::Deleted => {
                    // The active script stays loaded even if its backing
                    // file disappears.
                    debug!(target: "router", "path deleted: {}", event.path.display());
                }
                ChangeKind::None => {}
            }
        }

        for msg in self.messages.drain() {
            match protocol::dispatch(msg, &self.namespace) {
                Command::Load { path, args } => {
                    flow = flow.and(self.load(Path::new(&path), args, now));
                }
                Command::Reload => match self.session.reload(now) {
                    Ok(f) => flow = flow.and(f),
                    Err(e) => warn!(target: "router", "reload rejected: {e}"),
                },
                Command::Quit => {
                    info!(target: "router", "received quit message, exiting...");
                    flow = Flow::Terminate;
                }
                Command::Forward(msg) => {
                    flow = flow.and(self.session.forward_message(&msg, now));
                }
                Command::Ignore => {}
            }
        }

        flow = flow.and(self.session.tick(now));
        flow.and(self.session.update(dt, now))
    }

    /// Final unload at process shutdown.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }

    #[cfg(test)]
    pub(crate) fn watcher(&mut self) -> &mut W {
        &mut self.watcher
    }

    #[cfg(test)]
    pub(crate) fn messages(&mut self) -> &mut M {
        &mut self.messages
    }
}
