//! Classification of logging configuration inputs.
//!
//! Callers hand over a path, a bare logging mapping, or an options envelope.
//! The shape is decided once, here, and every later step works on the
//! normalized [`Envelope`].

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::LogError;

/// A logging configuration as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigInput {
    /// Path to a serialized logging configuration.
    Path(PathBuf),
    /// A bare logging mapping (no `options` key).
    RawConfig(Map<String, Value>),
    /// A mapping carrying `options.logging` among other options.
    Envelope(Map<String, Value>),
}

/// Where the logging configuration lives.
#[derive(Debug, Clone, PartialEq)]
pub enum LogSource {
    Path(PathBuf),
    Inline(Value),
}

/// Normalized `{ options: { logging, logger } }` view of an input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub logging: Option<LogSource>,
    pub logger: Option<String>,
}

impl ConfigInput {
    /// Classify a configuration value. The presence of an `options` key is
    /// the only thing separating a bare mapping from an envelope.
    pub fn classify(value: Value) -> Result<Self, LogError> {
        match value {
            Value::String(path) => Ok(ConfigInput::Path(PathBuf::from(path))),
            Value::Object(map) if map.contains_key("options") => Ok(ConfigInput::Envelope(map)),
            Value::Object(map) => Ok(ConfigInput::RawConfig(map)),
            other => Err(LogError::ConfigLoad(format!(
                "logging configuration must be a path or a mapping, got {}",
                kind(&other)
            ))),
        }
    }

    /// Wrap paths and bare mappings as `options.logging`; read envelopes as is.
    pub fn into_envelope(self) -> Result<Envelope, LogError> {
        match self {
            ConfigInput::Path(path) => Ok(Envelope {
                logging: Some(LogSource::Path(path)),
                logger: None,
            }),
            ConfigInput::RawConfig(map) => Ok(Envelope {
                logging: Some(LogSource::Inline(Value::Object(map))),
                logger: None,
            }),
            ConfigInput::Envelope(mut map) => {
                let Some(Value::Object(mut options)) = map.remove("options") else {
                    return Ok(Envelope::default());
                };
                let logging = options.remove("logging").map(|v| match v {
                    Value::String(path) => LogSource::Path(PathBuf::from(path)),
                    other => LogSource::Inline(other),
                });
                let logger = match options.remove("logger") {
                    None => None,
                    Some(Value::String(name)) => Some(name),
                    Some(other) => {
                        return Err(LogError::ConfigLoad(format!(
                            "options.logger must be a string, got {}",
                            kind(&other)
                        )));
                    }
                };
                Ok(Envelope { logging, logger })
            }
        }
    }
}

impl From<PathBuf> for ConfigInput {
    fn from(path: PathBuf) -> Self {
        ConfigInput::Path(path)
    }
}

impl From<&std::path::Path> for ConfigInput {
    fn from(path: &std::path::Path) -> Self {
        ConfigInput::Path(path.to_path_buf())
    }
}

impl From<Map<String, Value>> for ConfigInput {
    fn from(map: Map<String, Value>) -> Self {
        if map.contains_key("options") {
            ConfigInput::Envelope(map)
        } else {
            ConfigInput::RawConfig(map)
        }
    }
}

impl TryFrom<Value> for ConfigInput {
    type Error = LogError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        ConfigInput::classify(value)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
