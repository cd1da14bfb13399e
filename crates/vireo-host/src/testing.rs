//! Test doubles shared by the session and router tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vireo_engine::{EngineError, ScriptEngine};
use vireo_events::{ChangeSource, ControlMessage, MessageSource, PathChangeEvent};

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Unload,
    Update,
    Message(String),
}

/// Fake engine that records every invocation and can be scripted to fail.
///
/// Interior mutability lets tests poke failure triggers through the
/// session's shared accessor.
#[derive(Default)]
pub struct RecordingEngine {
    calls: RefCell<Vec<Call>>,
    last_args: RefCell<Vec<String>>,
    fail_load: RefCell<Option<String>>,
    fail_update: RefCell<Option<String>>,
    fail_message: RefCell<Option<String>>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn last_args(&self) -> Vec<String> {
        self.last_args.borrow().clone()
    }

    pub fn load_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Load(_)))
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Message(addr) => Some(addr.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fail_next_load(&self, message: &str) {
        *self.fail_load.borrow_mut() = Some(message.to_string());
    }

    pub fn fail_next_update(&self, message: &str) {
        *self.fail_update.borrow_mut() = Some(message.to_string());
    }

    pub fn fail_next_message(&self, message: &str) {
        *self.fail_message.borrow_mut() = Some(message.to_string());
    }
}

impl ScriptEngine for RecordingEngine {
    fn load(&mut self, path: &Path, args: &[String]) -> Result<(), EngineError> {
        self.calls
            .borrow_mut()
            .push(Call::Load(path.display().to_string()));
        *self.last_args.borrow_mut() = args.to_vec();
        match self.fail_load.borrow_mut().take() {
            Some(msg) => Err(EngineError::Load(msg)),
            None => Ok(()),
        }
    }

    fn unload(&mut self) {
        self.calls.borrow_mut().push(Call::Unload);
    }

    fn update(&mut self, _dt: Duration) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(Call::Update);
        match self.fail_update.borrow_mut().take() {
            Some(msg) => Err(EngineError::Runtime(msg)),
            None => Ok(()),
        }
    }

    fn message(&mut self, msg: &ControlMessage) -> Result<(), EngineError> {
        self.calls
            .borrow_mut()
            .push(Call::Message(msg.addr.clone()));
        match self.fail_message.borrow_mut().take() {
            Some(m) => Err(EngineError::Runtime(m)),
            None => Ok(()),
        }
    }
}

/// Change source fed from a queue, recording watch-set mutations.
#[derive(Default)]
pub struct StubChangeSource {
    pub queued: Vec<PathChangeEvent>,
    pub watched_paths: Vec<PathBuf>,
}

impl ChangeSource for StubChangeSource {
    fn drain(&mut self) -> Vec<PathChangeEvent> {
        std::mem::take(&mut self.queued)
    }

    fn add_path(&mut self, path: &Path) {
        if !self.watched_paths.iter().any(|p| p == path) {
            self.watched_paths.push(path.to_path_buf());
        }
    }

    fn remove_all_paths(&mut self) {
        self.watched_paths.clear();
    }

    fn watched(&self) -> &[PathBuf] {
        &self.watched_paths
    }
}

/// Message source fed from a queue.
#[derive(Default)]
pub struct StubMessageSource {
    pub queued: Vec<ControlMessage>,
}

impl MessageSource for StubMessageSource {
    fn drain(&mut self) -> Vec<ControlMessage> {
        std::mem::take(&mut self.queued)
    }
}
