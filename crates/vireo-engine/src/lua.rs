//! Lua implementation of the [`ScriptEngine`] capability.
//!
//! Each `load` builds a fresh VM so a reloaded script never sees state left
//! behind by the previous run. Scripts receive their arguments through the
//! standard Lua `arg` table (`arg[0]` is the script path) and may define
//! any of the optional entry points `setup()`, `update(dt)`,
//! `message(addr, args)` and `exit()`.

use std::path::Path;
use std::time::Duration;

use mlua::{Function, Lua, Value, Variadic};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use vireo_events::{ControlMessage, ControlValue};

use crate::{EngineError, ScriptEngine};

/// Lua VM host for a single active script.
pub struct LuaEngine {
    vm: Option<Lua>,
    outbound: Option<UnboundedSender<ControlMessage>>,
}

impl LuaEngine {
    pub fn new() -> Self {
        Self {
            vm: None,
            outbound: None,
        }
    }

    /// Create an engine whose scripts can send control messages through
    /// `vireo.send(addr, ...)`; messages land on the given channel.
    pub fn with_outbound(outbound: UnboundedSender<ControlMessage>) -> Self {
        Self {
            vm: None,
            outbound: Some(outbound),
        }
    }

    /// Register the `vireo` host table (log, log_verbose, send).
    fn install_host_api(&self, lua: &Lua) -> mlua::Result<()> {
        let host = lua.create_table()?;

        host.set(
            "log",
            lua.create_function(|_, msg: String| {
                info!(target: "script", "{msg}");
                Ok(())
            })?,
        )?;
        host.set(
            "log_verbose",
            lua.create_function(|_, msg: String| {
                debug!(target: "script", "{msg}");
                Ok(())
            })?,
        )?;

        match &self.outbound {
            Some(tx) => {
                let tx = tx.clone();
                host.set(
                    "send",
                    lua.create_function(move |_, (addr, values): (String, Variadic<Value>)| {
                        let mut msg = ControlMessage::new(addr);
                        for value in values.iter() {
                            match to_control_value(value) {
                                Some(arg) => msg.args.push(arg),
                                None => {
                                    warn!(
                                        target: "script",
                                        "vireo.send: dropping unsupported value: {}",
                                        value.type_name()
                                    );
                                }
                            }
                        }
                        if tx.send(msg).is_err() {
                            warn!(target: "script", "vireo.send: outbound channel closed");
                        }
                        Ok(())
                    })?,
                )?;
            }
            None => {
                host.set(
                    "send",
                    lua.create_function(|_, (_addr, _values): (String, Variadic<Value>)| {
                        warn!(target: "script", "vireo.send: no outbound channel configured");
                        Ok(())
                    })?,
                )?;
            }
        }

        lua.globals().set("vireo", host)
    }

    /// Look up an optional global entry point in the running VM.
    fn entry_point(&self, name: &str) -> Option<(Function, &Lua)> {
        let lua = self.vm.as_ref()?;
        let func = lua.globals().get::<Function>(name).ok()?;
        Some((func, lua))
    }
}

impl Default for LuaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for LuaEngine {
    fn load(&mut self, path: &Path, args: &[String]) -> Result<(), EngineError> {
        self.unload();

        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Load(format!("{}: {e}", path.display())))?;

        let lua = Lua::new();
        self.install_host_api(&lua)
            .map_err(|e| EngineError::Load(e.to_string()))?;

        // Lua interpreter convention: arg[0] is the script, arg[1..] the args.
        let arg_table = lua
            .create_table()
            .map_err(|e| EngineError::Load(e.to_string()))?;
        arg_table
            .set(0, path.display().to_string())
            .map_err(|e| EngineError::Load(e.to_string()))?;
        for (i, arg) in args.iter().enumerate() {
            arg_table
                .set(i + 1, arg.as_str())
                .map_err(|e| EngineError::Load(e.to_string()))?;
        }
        lua.globals()
            .set("arg", arg_table)
            .map_err(|e| EngineError::Load(e.to_string()))?;

        lua.load(&source)
            .set_name(path.display().to_string())
            .exec()
            .map_err(|e| EngineError::Load(e.to_string()))?;

        if let Ok(setup) = lua.globals().get::<Function>("setup") {
            setup
                .call::<()>(())
                .map_err(|e| EngineError::Load(e.to_string()))?;
        }

        debug!(target: "script", "lua vm ready for {}", path.display());
        self.vm = Some(lua);
        Ok(())
    }

    fn unload(&mut self) {
        let Some(lua) = self.vm.take() else {
            return;
        };
        if let Ok(exit) = lua.globals().get::<Function>("exit") {
            if let Err(e) = exit.call::<()>(()) {
                warn!(target: "script", "error in exit(): {e}");
            }
        }
        debug!(target: "script", "lua vm dropped");
    }

    fn update(&mut self, dt: Duration) -> Result<(), EngineError> {
        let Some((update, _)) = self.entry_point("update") else {
            return Ok(());
        };
        update
            .call::<()>(dt.as_secs_f64())
            .map_err(|e| EngineError::Runtime(e.to_string()))
    }

    fn message(&mut self, msg: &ControlMessage) -> Result<(), EngineError> {
        let Some((handler, lua)) = self.entry_point("message") else {
            debug!(target: "script", "no message() handler, dropping {}", msg.addr);
            return Ok(());
        };
        let args = lua
            .create_table()
            .map_err(|e| EngineError::Runtime(e.to_string()))?;
        for (i, value) in msg.args.iter().enumerate() {
            let value = to_lua_value(lua, value).map_err(|e| EngineError::Runtime(e.to_string()))?;
            args.set(i + 1, value)
                .map_err(|e| EngineError::Runtime(e.to_string()))?;
        }
        handler
            .call::<()>((msg.addr.as_str(), args))
            .map_err(|e| EngineError::Runtime(e.to_string()))
    }
}

fn to_lua_value(lua: &Lua, value: &ControlValue) -> mlua::Result<Value> {
    Ok(match value {
        ControlValue::Int32(v) => Value::Integer(i64::from(*v)),
        ControlValue::Int64(v) => Value::Integer(*v),
        ControlValue::Float32(v) => Value::Number(f64::from(*v)),
        ControlValue::Float64(v) => Value::Number(*v),
        ControlValue::String(s) | ControlValue::Symbol(s) => Value::String(lua.create_string(s)?),
        ControlValue::Blob(b) => Value::String(lua.create_string(b)?),
        ControlValue::Bool(b) => Value::Boolean(*b),
        ControlValue::Nil => Value::Nil,
    })
}

fn to_control_value(value: &Value) -> Option<ControlValue> {
    match value {
        Value::Integer(i) => Some(match i32::try_from(*i) {
            Ok(v) => ControlValue::Int32(v),
            Err(_) => ControlValue::Int64(*i),
        }),
        Value::Number(n) => Some(ControlValue::Float32(*n as f32)),
        Value::String(s) => Some(ControlValue::String(s.to_string_lossy().to_string())),
        Value::Boolean(b) => Some(ControlValue::Bool(*b)),
        Value::Nil => Some(ControlValue::Nil),
        _ => None,
    }
}
