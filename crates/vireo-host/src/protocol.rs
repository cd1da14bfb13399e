//! Control protocol command vocabulary.
//!
//! Stateless: a pure function of the message and the configured namespace
//! prefix. Anything outside the fixed vocabulary is returned to the router
//! for verbatim forwarding to the scripting engine.

use tracing::{debug, warn};

use vireo_events::{ControlMessage, ControlValue};

/// Outcome of interpreting one control message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `<ns>/load <path> [args...]`
    Load { path: String, args: Vec<String> },
    /// `<ns>/reload`
    Reload,
    /// `<ns>/quit`
    Quit,
    /// Not ours; hand to the engine untouched.
    Forward(ControlMessage),
    /// Recognized address but unusable argument shape.
    Ignore,
}

/// Interpret `msg` under the given namespace prefix (e.g. `/vireo`).
pub fn dispatch(msg: ControlMessage, namespace: &str) -> Command {
    let Some(command) = msg.addr.strip_prefix(namespace) else {
        return Command::Forward(msg);
    };
    match command {
        "/load" => match msg.args.first() {
            Some(ControlValue::String(path)) => Command::Load {
                path: path.clone(),
                args: coerce_args(&msg.args[1..]),
            },
            _ => {
                debug!(target: "router", "ignoring /load without a string path");
                Command::Ignore
            }
        },
        "/reload" => Command::Reload,
        "/quit" => Command::Quit,
        _ => Command::Forward(msg),
    }
}

/// Stringify message arguments into script arguments, preserving order.
///
/// Formatting goes through `Display`, which for floats is the shortest
/// representation that reads back to the same value, so arguments survive
/// the trip into script-visible strings.
fn coerce_args(values: &[ControlValue]) -> Vec<String> {
    let mut args = Vec::with_capacity(values.len());
    for value in values {
        match value {
            ControlValue::Int32(v) => args.push(v.to_string()),
            ControlValue::Int64(v) => args.push(v.to_string()),
            ControlValue::Float32(v) => args.push(v.to_string()),
            ControlValue::Float64(v) => args.push(v.to_string()),
            ControlValue::String(s) | ControlValue::Symbol(s) => args.push(s.clone()),
            other => {
                warn!(
                    target: "router",
                    "dropping script arg of type '{}'",
                    other.type_tag()
                );
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "/vireo";

    #[test]
    fn test_load_command_coerces_args_in_order() {
        let msg = ControlMessage::new("/vireo/load")
            .with_arg(ControlValue::String("demo.lua".into()))
            .with_arg(ControlValue::Int32(42))
            .with_arg(ControlValue::Float32(3.5))
            .with_arg(ControlValue::String("x".into()));
        assert_eq!(
            dispatch(msg, NS),
            Command::Load {
                path: "demo.lua".into(),
                args: vec!["42".into(), "3.5".into(), "x".into()],
            }
        );
    }

    #[test]
    fn test_load_coerces_all_recognized_kinds() {
        let msg = ControlMessage::new("/vireo/load")
            .with_arg(ControlValue::String("demo.lua".into()))
            .with_arg(ControlValue::Int64(1 << 40))
            .with_arg(ControlValue::Float64(0.25))
            .with_arg(ControlValue::Symbol("sym".into()));
        assert_eq!(
            dispatch(msg, NS),
            Command::Load {
                path: "demo.lua".into(),
                args: vec![(1i64 << 40).to_string(), "0.25".into(), "sym".into()],
            }
        );
    }

    #[test]
    fn test_load_drops_unrecognized_arg_kinds_but_keeps_rest() {
        let msg = ControlMessage::new("/vireo/load")
            .with_arg(ControlValue::String("demo.lua".into()))
            .with_arg(ControlValue::Blob(vec![1, 2]))
            .with_arg(ControlValue::Int32(7))
            .with_arg(ControlValue::Bool(true))
            .with_arg(ControlValue::Nil)
            .with_arg(ControlValue::String("tail".into()));
        assert_eq!(
            dispatch(msg, NS),
            Command::Load {
                path: "demo.lua".into(),
                args: vec!["7".into(), "tail".into()],
            }
        );
    }

    #[test]
    fn test_load_without_args_is_ignored() {
        let msg = ControlMessage::new("/vireo/load");
        assert_eq!(dispatch(msg, NS), Command::Ignore);
    }

    #[test]
    fn test_load_with_non_string_path_is_ignored() {
        let msg = ControlMessage::new("/vireo/load").with_arg(ControlValue::Int32(1));
        assert_eq!(dispatch(msg, NS), Command::Ignore);
    }

    #[test]
    fn test_reload_and_quit() {
        assert_eq!(dispatch(ControlMessage::new("/vireo/reload"), NS), Command::Reload);
        assert_eq!(dispatch(ControlMessage::new("/vireo/quit"), NS), Command::Quit);
    }

    #[test]
    fn test_unrecognized_address_forwarded_untouched() {
        let msg = ControlMessage::new("/vireo/volume").with_arg(ControlValue::Float32(0.5));
        assert_eq!(dispatch(msg.clone(), NS), Command::Forward(msg));
    }

    #[test]
    fn test_other_namespace_forwarded() {
        let msg = ControlMessage::new("/other/load")
            .with_arg(ControlValue::String("demo.lua".into()));
        assert_eq!(dispatch(msg.clone(), NS), Command::Forward(msg));
    }
}
