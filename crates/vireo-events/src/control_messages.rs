/// A typed argument carried by a control message.
///
/// The tag characters follow the OSC type tag convention so the wire codec
/// and the warning logs agree on names. The command dispatcher only coerces
/// the first six kinds into script arguments; the rest are carried for
/// forwarding but dropped (with a warning) from argument lists.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Symbol(String),
    Blob(Vec<u8>),
    Bool(bool),
    Nil,
}

impl ControlValue {
    /// OSC-style type tag for this value.
    pub fn type_tag(&self) -> char {
        match self {
            ControlValue::Int32(_) => 'i',
            ControlValue::Int64(_) => 'h',
            ControlValue::Float32(_) => 'f',
            ControlValue::Float64(_) => 'd',
            ControlValue::String(_) => 's',
            ControlValue::Symbol(_) => 'S',
            ControlValue::Blob(_) => 'b',
            ControlValue::Bool(true) => 'T',
            ControlValue::Bool(false) => 'F',
            ControlValue::Nil => 'N',
        }
    }
}

/// An addressed control message with positional typed arguments.
///
/// Produced by the control channel, consumed exactly once by the event
/// router: either interpreted as a command under the configured namespace
/// or forwarded verbatim to the scripting engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub addr: String,
    pub args: Vec<ControlValue>,
}

impl ControlMessage {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: ControlValue) -> Self {
        self.args.push(arg);
        self
    }
}
