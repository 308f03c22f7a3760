//! Numeric record severities.
//!
//! Levels follow the dictionary logging contract: named thresholds spaced by
//! ten, with arbitrary integers allowed in between. They map onto the five
//! `tracing` levels when records are handed to a handler's dispatch.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::error::LogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(u32);

impl Level {
    pub const NOTSET: Level = Level(0);
    pub const DEBUG: Level = Level(10);
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn name(self) -> Cow<'static, str> {
        match self {
            Level::NOTSET => Cow::Borrowed("NOTSET"),
            Level::DEBUG => Cow::Borrowed("DEBUG"),
            Level::INFO => Cow::Borrowed("INFO"),
            Level::WARNING => Cow::Borrowed("WARNING"),
            Level::ERROR => Cow::Borrowed("ERROR"),
            Level::CRITICAL => Cow::Borrowed("CRITICAL"),
            Level(n) => Cow::Owned(format!("Level {n}")),
        }
    }

    /// Look up a level by its registered upper-case name.
    pub fn from_name(name: &str) -> Option<Level> {
        match name {
            "CRITICAL" | "FATAL" => Some(Level::CRITICAL),
            "ERROR" => Some(Level::ERROR),
            "WARNING" | "WARN" => Some(Level::WARNING),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "NOTSET" => Some(Level::NOTSET),
            _ => None,
        }
    }

    /// Parse a level as it appears in a configuration mapping: either a
    /// registered name or a non-negative integer.
    pub fn from_value(value: &Value) -> Result<Level, LogError> {
        match value {
            Value::String(s) => Level::from_name(s)
                .ok_or_else(|| LogError::ConfigApply(format!("unknown level: '{s}'"))),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Level)
                .ok_or_else(|| LogError::ConfigApply(format!("invalid numeric level: {n}"))),
            other => Err(LogError::ConfigApply(format!(
                "level must be a name or an integer, got {other}"
            ))),
        }
    }

    pub fn as_tracing(self) -> tracing::Level {
        match self.0 {
            n if n >= Level::ERROR.0 => tracing::Level::ERROR,
            n if n >= Level::WARNING.0 => tracing::Level::WARN,
            n if n >= Level::INFO.0 => tracing::Level::INFO,
            n if n >= Level::DEBUG.0 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    pub fn from_tracing(level: tracing::Level) -> Level {
        match level {
            tracing::Level::ERROR => Level::ERROR,
            tracing::Level::WARN => Level::WARNING,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::TRACE => Level::NOTSET,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_names_parse() {
        for (name, level) in [
            ("CRITICAL", Level::CRITICAL),
            ("FATAL", Level::CRITICAL),
            ("ERROR", Level::ERROR),
            ("WARNING", Level::WARNING),
            ("WARN", Level::WARNING),
            ("INFO", Level::INFO),
            ("DEBUG", Level::DEBUG),
            ("NOTSET", Level::NOTSET),
        ] {
            assert_eq!(Level::from_value(&json!(name)).unwrap(), level, "{name}");
        }
    }

    #[test]
    fn lower_case_names_are_rejected() {
        let err = Level::from_value(&json!("info")).unwrap_err();
        assert!(matches!(err, LogError::ConfigApply(msg) if msg.contains("unknown level")));
    }

    #[test]
    fn integers_are_accepted() {
        assert_eq!(Level::from_value(&json!(25)).unwrap(), Level::new(25));
        assert!(Level::from_value(&json!(-1)).is_err());
        assert!(Level::from_value(&json!(true)).is_err());
    }

    #[test]
    fn custom_levels_have_generic_names() {
        assert_eq!(Level::new(25).name(), "Level 25");
        assert_eq!(Level::WARNING.to_string(), "WARNING");
    }

    #[test]
    fn maps_onto_tracing_levels() {
        assert_eq!(Level::CRITICAL.as_tracing(), tracing::Level::ERROR);
        assert_eq!(Level::new(35).as_tracing(), tracing::Level::WARN);
        assert_eq!(Level::INFO.as_tracing(), tracing::Level::INFO);
        assert_eq!(Level::new(5).as_tracing(), tracing::Level::TRACE);
        assert_eq!(Level::from_tracing(tracing::Level::WARN), Level::WARNING);
    }

    #[test]
    fn ordering_follows_severity() {
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::CRITICAL > Level::ERROR);
    }
}
