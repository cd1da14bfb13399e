//! Script session state machine.
//!
//! Owns the identity (path + args) and health of the single active script
//! and mediates every engine invocation. Reload is literally
//! load-with-same-identity, so load and reload can never diverge in
//! behavior; there is exactly one code path for "a script becomes active".

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use vireo_engine::{is_loadable_path, ScriptEngine};
use vireo_events::ControlMessage;

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Unloaded,
    Running,
    Errored,
}

/// Configured reaction to a script error. Mutually exclusive; the last
/// configured policy wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stay errored until an explicit reload/clear/load.
    None,
    /// Request process termination.
    ExitOnError,
    /// Schedule an automatic reload after the given delay.
    ReloadAfterDelay(Duration),
}

/// Whether the caller should keep running or shut the process down.
///
/// Termination is signalled upward, never performed inside the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    Continue,
    Terminate,
}

impl Flow {
    /// Combine two outcomes; a termination request is never lost.
    pub fn and(self, other: Flow) -> Flow {
        match (self, other) {
            (Flow::Continue, Flow::Continue) => Flow::Continue,
            _ => Flow::Terminate,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not a loadable script path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Stateful owner of the loaded script and its recovery state.
pub struct ScriptSession<E: ScriptEngine> {
    engine: E,
    path: Option<PathBuf>,
    args: Vec<String>,
    health: Health,
    policy: ErrorPolicy,
    pending_reload_at: Option<Instant>,
    last_error: Option<String>,
}

impl<E: ScriptEngine> ScriptSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            path: None,
            args: Vec::new(),
            health: Health::Unloaded,
            policy: ErrorPolicy::None,
            pending_reload_at: None,
            last_error: None,
        }
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Message of the most recent engine error, kept for operator display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending_reload_at(&self) -> Option<Instant> {
        self.pending_reload_at
    }

    pub fn set_error_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
        // A pending auto-reload only exists under ReloadAfterDelay.
        if !matches!(policy, ErrorPolicy::ReloadAfterDelay(_)) {
            self.pending_reload_at = None;
        }
    }

    /// Make the script at `path` the active one.
    ///
    /// Any current script is torn down first; at most one script is ever
    /// loaded. An engine load failure does not surface as an error here:
    /// the session records the identity, becomes Errored and applies the
    /// error policy, so an explicit reload can retry the same script.
    pub fn load(
        &mut self,
        path: &Path,
        args: Vec<String>,
        now: Instant,
    ) -> Result<Flow, SessionError> {
        if !is_loadable_path(path) {
            return Err(SessionError::InvalidPath(path.to_path_buf()));
        }

        self.engine.unload();
        self.pending_reload_at = None;
        self.last_error = None;
        self.path = Some(path.to_path_buf());
        self.args = args;

        match self.engine.load(path, &self.args) {
            Ok(()) => {
                info!(target: "session", "loaded {}", path.display());
                self.health = Health::Running;
                Ok(Flow::Continue)
            }
            Err(e) => Ok(self.on_engine_error(&e.to_string(), now)),
        }
    }

    /// Reload the current script with its stored identity. No-op when
    /// nothing is loaded.
    pub fn reload(&mut self, now: Instant) -> Result<Flow, SessionError> {
        let Some(path) = self.path.clone() else {
            debug!(target: "session", "reload requested with no script loaded");
            return Ok(Flow::Continue);
        };
        info!(target: "session", "reloading {}", path.display());
        let args = self.args.clone();
        self.load(&path, args, now)
    }

    /// Unload unconditionally and forget the script identity.
    pub fn clear(&mut self) {
        self.engine.unload();
        self.path = None;
        self.args.clear();
        self.health = Health::Unloaded;
        self.pending_reload_at = None;
        self.last_error = None;
        info!(target: "session", "cleared script");
    }

    /// React to a script error according to the configured policy.
    pub fn on_engine_error(&mut self, message: &str, now: Instant) -> Flow {
        warn!(target: "session", "script error: {message}");
        self.health = Health::Errored;
        self.last_error = Some(message.to_string());
        match self.policy {
            ErrorPolicy::ExitOnError => {
                self.pending_reload_at = None;
                Flow::Terminate
            }
            ErrorPolicy::ReloadAfterDelay(delay) => {
                self.pending_reload_at = Some(now + delay);
                Flow::Continue
            }
            ErrorPolicy::None => Flow::Continue,
        }
    }

    /// Fire a due auto-reload. The pending timestamp is cleared regardless
    /// of the reload's outcome: a failed auto-reload must not re-arm
    /// itself, only a fresh error does.
    pub fn tick(&mut self, now: Instant) -> Flow {
        let due = self.health == Health::Errored
            && self.pending_reload_at.is_some_and(|at| now >= at);
        if !due {
            return Flow::Continue;
        }

        info!(target: "session", "auto-reloading after script error");
        let flow = match self.reload(now) {
            Ok(flow) => flow,
            Err(e) => {
                warn!(target: "session", "auto-reload failed: {e}");
                Flow::Continue
            }
        };
        self.pending_reload_at = None;
        flow
    }

    /// Dispatch the per-tick update callback while the script is healthy.
    pub fn update(&mut self, dt: Duration, now: Instant) -> Flow {
        if self.health != Health::Running {
            return Flow::Continue;
        }
        match self.engine.update(dt) {
            Ok(()) => Flow::Continue,
            Err(e) => self.on_engine_error(&e.to_string(), now),
        }
    }

    /// Forward a control message the protocol did not recognize.
    pub fn forward_message(&mut self, msg: &ControlMessage, now: Instant) -> Flow {
        if self.health != Health::Running {
            debug!(target: "session", "dropping {} (no running script)", msg.addr);
            return Flow::Continue;
        }
        match self.engine.message(msg) {
            Ok(()) => Flow::Continue,
            Err(e) => self.on_engine_error(&e.to_string(), now),
        }
    }

    /// Final unload at process shutdown.
    pub fn shutdown(&mut self) {
        self.engine.unload();
        self.health = Health::Unloaded;
        self.path = None;
        self.pending_reload_at = None;
    }

    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }
}
