//! Default injection into a canonical logging configuration.
//!
//! Each step takes the configuration by value and returns it, filling in
//! only what is absent. Steps leave non-mapping values alone; the facility
//! rejects those when the configuration is applied.

use std::path::Path;

use serde_json::{json, Map, Value};

use crate::facility::FILE_HANDLER;

/// Handler that receives the log file passed to the resolver.
pub const DATAFLOW_HANDLER: &str = "dataflow";
pub const DEFAULT_HANDLER_LEVEL: &str = "INFO";
pub const DEFAULT_VERSION: u64 = 1;

/// A canonical logging configuration value.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig(Value);

impl LogConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_mapping(&self) -> bool {
        self.0.is_object()
    }

    /// Make sure handler `name` exists and writes to `filename`.
    ///
    /// `filename` is always overwritten; `class` defaults to a file handler
    /// and `level` to `INFO`.
    pub fn ensure_handler(mut self, name: &str, filename: &Path) -> Self {
        if let Some(handler) = self
            .mapping_mut()
            .and_then(|map| entry_mapping(map, "handlers"))
            .and_then(|handlers| entry_mapping(handlers, name))
        {
            handler.insert("filename".into(), json!(filename.to_string_lossy()));
            handler
                .entry("class")
                .or_insert_with(|| json!(FILE_HANDLER));
            handler
                .entry("level")
                .or_insert_with(|| json!(DEFAULT_HANDLER_LEVEL));
        }
        self
    }

    pub fn ensure_version(mut self) -> Self {
        if let Some(map) = self.mapping_mut() {
            map.entry("version").or_insert_with(|| json!(DEFAULT_VERSION));
        }
        self
    }

    /// Route the root logger to `handler` when the configuration wires no
    /// loggers at all. An explicit `root` or `loggers` entry always wins.
    pub fn ensure_root_if_absent(mut self, handler: &str) -> Self {
        let Some(map) = self.mapping_mut() else {
            return self;
        };
        if map.contains_key("root") || map.contains_key("loggers") {
            return self;
        }
        let Some(level) = map
            .get("handlers")
            .and_then(|h| h.get(handler))
            .map(|h| h.get("level").cloned().unwrap_or_else(|| json!(DEFAULT_HANDLER_LEVEL)))
        else {
            return self;
        };
        map.insert("root".into(), json!({ "level": level, "handlers": [handler] }));
        self
    }

    fn mapping_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.as_object_mut()
    }
}

impl From<Value> for LogConfig {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// `map[key]`, created as an empty mapping when absent. `None` when the
/// existing entry is not a mapping.
fn entry_mapping<'m>(map: &'m mut Map<String, Value>, key: &str) -> Option<&'m mut Map<String, Value>> {
    map.entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_file() -> &'static Path {
        Path::new("/tmp/out.log")
    }

    #[test]
    fn empty_config_gets_full_structure() {
        let cfg = LogConfig::new(json!({}))
            .ensure_handler(DATAFLOW_HANDLER, log_file())
            .ensure_version()
            .ensure_root_if_absent(DATAFLOW_HANDLER);
        assert_eq!(
            cfg.into_value(),
            json!({
                "version": 1,
                "handlers": {
                    "dataflow": {
                        "filename": "/tmp/out.log",
                        "class": "logging.FileHandler",
                        "level": "INFO"
                    }
                },
                "root": {"level": "INFO", "handlers": ["dataflow"]}
            })
        );
    }

    #[test]
    fn existing_handler_settings_are_kept_but_filename_is_forced() {
        let cfg = LogConfig::new(json!({
            "version": 1,
            "handlers": {
                "dataflow": {"class": "logging.StreamHandler", "level": "DEBUG", "filename": "old.log"}
            }
        }))
        .ensure_handler(DATAFLOW_HANDLER, log_file())
        .ensure_root_if_absent(DATAFLOW_HANDLER);

        let v = cfg.as_value();
        assert_eq!(v["handlers"]["dataflow"]["class"], json!("logging.StreamHandler"));
        assert_eq!(v["handlers"]["dataflow"]["filename"], json!("/tmp/out.log"));
        assert_eq!(v["root"], json!({"level": "DEBUG", "handlers": ["dataflow"]}));
    }

    #[test]
    fn explicit_root_is_preserved() {
        let root = json!({"level": "WARNING", "handlers": []});
        let cfg = LogConfig::new(json!({"root": root.clone()}))
            .ensure_handler(DATAFLOW_HANDLER, log_file())
            .ensure_root_if_absent(DATAFLOW_HANDLER);
        assert_eq!(cfg.as_value()["root"], root);
    }

    #[test]
    fn explicit_loggers_suppress_root_synthesis() {
        let cfg = LogConfig::new(json!({"loggers": {"prod": {"level": "INFO"}}}))
            .ensure_handler(DATAFLOW_HANDLER, log_file())
            .ensure_root_if_absent(DATAFLOW_HANDLER);
        assert!(cfg.as_value().get("root").is_none());
    }

    #[test]
    fn version_is_not_overwritten() {
        let cfg = LogConfig::new(json!({"version": 2})).ensure_version();
        assert_eq!(cfg.as_value()["version"], json!(2));
    }

    #[test]
    fn non_mapping_values_pass_through() {
        let cfg = LogConfig::new(json!(42))
            .ensure_handler(DATAFLOW_HANDLER, log_file())
            .ensure_version()
            .ensure_root_if_absent(DATAFLOW_HANDLER);
        assert_eq!(cfg.into_value(), json!(42));
    }

    #[test]
    fn non_mapping_handlers_entry_is_left_alone() {
        let cfg = LogConfig::new(json!({"handlers": ["dataflow"]}))
            .ensure_handler(DATAFLOW_HANDLER, log_file());
        assert_eq!(cfg.as_value()["handlers"], json!(["dataflow"]));
    }
}
