//! Configuration loading for logging setups.
//!
//! Reads JSON or TOML files into a `serde_json::Value`. Several files can be
//! read at once; they are deep-merged in order so later files only need to
//! specify the keys that differ.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LogError;

/// Deep-merge two values.
/// Mappings are merged recursively. For every other type (string, number,
/// array, …) the overlay value replaces the base value wholesale.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, ov_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_values(base_val, ov_val),
                    None => ov_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Read a single configuration file.
///
/// The format is chosen by extension: `.json` or `.toml`. Any other extension
/// is tried as JSON first, then as TOML.
pub fn read_from(path: &Path) -> Result<Value, LogError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| LogError::ConfigLoad(format!("cannot read {}: {e}", path.display())))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("json") => parse_json(path, &raw),
        Some("toml") => parse_toml(path, &raw),
        _ => parse_json(path, &raw).or_else(|_| parse_toml(path, &raw)),
    }
}

/// Read several configuration files and deep-merge them in order.
pub fn read_from_all<P: AsRef<Path>>(paths: &[P]) -> Result<Value, LogError> {
    let mut merged = Value::Object(serde_json::Map::new());
    for path in paths {
        merged = merge_values(merged, read_from(path.as_ref())?);
    }
    Ok(merged)
}

fn parse_json(path: &Path, raw: &str) -> Result<Value, LogError> {
    serde_json::from_str(raw)
        .map_err(|e| LogError::ConfigLoad(format!("parse error in {}: {e}", path.display())))
}

fn parse_toml(path: &Path, raw: &str) -> Result<Value, LogError> {
    toml::from_str(raw)
        .map_err(|e| LogError::ConfigLoad(format!("parse error in {}: {e}", path.display())))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_named(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn reads_json_by_extension() {
        let dir = TempDir::new().unwrap();
        let p = write_named(&dir, "log.json", r#"{"version": 1, "root": {"level": "INFO"}}"#);
        let v = read_from(&p).unwrap();
        assert_eq!(v["version"], json!(1));
        assert_eq!(v["root"]["level"], json!("INFO"));
    }

    #[test]
    fn reads_toml_by_extension() {
        let dir = TempDir::new().unwrap();
        let toml = r#"
version = 1

[handlers.console]
class = "logging.StreamHandler"
level = "DEBUG"
"#;
        let p = write_named(&dir, "log.toml", toml);
        let v = read_from(&p).unwrap();
        assert_eq!(v["handlers"]["console"]["class"], json!("logging.StreamHandler"));
    }

    #[test]
    fn unknown_extension_falls_back_to_toml() {
        let dir = TempDir::new().unwrap();
        let p = write_named(&dir, "log.cfg", "version = 1\n");
        assert_eq!(read_from(&p).unwrap()["version"], json!(1));
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = read_from(Path::new("/nonexistent/logging.json")).unwrap_err();
        assert!(matches!(err, LogError::ConfigLoad(_)));
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn malformed_json_is_load_error() {
        let dir = TempDir::new().unwrap();
        let p = write_named(&dir, "broken.json", "{ \"version\": ");
        let err = read_from(&p).unwrap_err();
        assert!(matches!(err, LogError::ConfigLoad(msg) if msg.contains("parse error")));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = TempDir::new().unwrap();
        let a = write_named(
            &dir,
            "a.json",
            r#"{"version": 1, "root": {"level": "INFO", "handlers": ["a"]}}"#,
        );
        let b = write_named(&dir, "b.toml", "[root]\nlevel = \"DEBUG\"\n");
        let v = read_from_all(&[a, b]).unwrap();
        assert_eq!(v["version"], json!(1));
        assert_eq!(v["root"]["level"], json!("DEBUG"));
        assert_eq!(v["root"]["handlers"], json!(["a"]));
    }

    #[test]
    fn overlay_replaces_arrays_wholesale() {
        let merged = merge_values(json!({"h": ["a", "b"]}), json!({"h": ["c"]}));
        assert_eq!(merged, json!({"h": ["c"]}));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/logs/run.log");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("logs/run.log"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/tmp/out.log"), PathBuf::from("/tmp/out.log"));
    }
}
