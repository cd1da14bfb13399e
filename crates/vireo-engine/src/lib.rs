//! Scripting engine capability interface for vireo.
//!
//! The script session depends on this narrow trait, never on a concrete
//! engine, so the whole lifecycle state machine can be tested with a fake
//! engine that scripts specific failure sequences. The shipped
//! implementation is [`LuaEngine`], one fresh Lua VM per loaded script.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use vireo_events::ControlMessage;

pub mod lua;

pub use lua::LuaEngine;

/// Failure surfaced by an engine invocation.
///
/// A load failure and a runtime error are handled identically by the
/// session (health becomes Errored, the configured error policy applies);
/// the split exists for log readability.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("script load failed: {0}")]
    Load(String),
    #[error("script runtime error: {0}")]
    Runtime(String),
}

/// The capability surface the controller needs from a scripting engine.
///
/// All methods are synchronous and run to completion; runtime errors are
/// reported through `Err` return values rather than callbacks, which is
/// what keeps the tick loop free of interleaving.
pub trait ScriptEngine {
    /// Load and run the script at `path`, making `args` visible to it.
    /// Any previously loaded script must already have been unloaded.
    fn load(&mut self, path: &Path, args: &[String]) -> Result<(), EngineError>;

    /// Tear down the current script, if any. Idempotent.
    fn unload(&mut self);

    /// Dispatch the per-tick update callback to the loaded script.
    fn update(&mut self, dt: Duration) -> Result<(), EngineError>;

    /// Hand a forwarded control message to the loaded script.
    fn message(&mut self, msg: &ControlMessage) -> Result<(), EngineError>;
}

/// Whether `path` refers to a script the engine can load.
///
/// Pure extension check; used to filter drag/watch/control paths before
/// they ever reach the session.
pub fn is_loadable_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("lua"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_loadable_path_accepts_lua() {
        assert!(is_loadable_path(&PathBuf::from("demo.lua")));
        assert!(is_loadable_path(&PathBuf::from("/abs/dir/demo.LUA")));
    }

    #[test]
    fn test_loadable_path_rejects_other() {
        assert!(!is_loadable_path(&PathBuf::from("notes.txt")));
        assert!(!is_loadable_path(&PathBuf::from("lua")));
        assert!(!is_loadable_path(&PathBuf::from("dir/")));
    }
}
