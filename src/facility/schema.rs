//! Raw dictionary-configuration shapes.
//!
//! These structs mirror the canonical logging mapping and use `serde`
//! defaults. `LogFacility::configure` turns them into live handlers and
//! logger nodes.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

// ── Top-level ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct RawDictConfig {
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default = "default_true")]
    pub disable_existing_loggers: bool,
    #[serde(default)]
    pub formatters: BTreeMap<String, RawFormatter>,
    #[serde(default)]
    pub handlers: BTreeMap<String, RawHandler>,
    #[serde(default)]
    pub loggers: BTreeMap<String, RawLogger>,
    #[serde(default)]
    pub root: Option<RawLogger>,
}

// ── Formatters ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawFormatter {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub datefmt: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawHandler {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub level: Option<Value>,
    #[serde(default)]
    pub formatter: Option<String>,
    /// `FileHandler` only.
    #[serde(default)]
    pub filename: Option<String>,
    /// `FileHandler` only: `"a"` (default) or `"w"`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Accepted for compatibility; files are always written as UTF-8.
    #[serde(default)]
    #[allow(dead_code)]
    pub encoding: Option<String>,
    /// Accepted for compatibility; files are opened when the handler is built.
    #[serde(default)]
    #[allow(dead_code)]
    pub delay: Option<bool>,
    /// `StreamHandler` only: `ext://sys.stderr` (default) or `ext://sys.stdout`.
    #[serde(default)]
    pub stream: Option<String>,
}

// ── Loggers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawLogger {
    #[serde(default)]
    pub level: Option<Value>,
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default)]
    pub propagate: Option<bool>,
}

fn default_true() -> bool {
    true
}
