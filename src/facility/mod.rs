//! Process-wide logging facility.
//!
//! A registry of named, dot-separated hierarchical loggers with handlers,
//! levels and formatters, configured from a canonical logging mapping.
//!
//! # Module layout
//!
//! - **level**: numeric severities and their names.
//! - **schema**: raw `serde` shapes of the configuration mapping.
//! - **format**: `%(field)s` template formatter.
//! - **handler**: file, stream and null handlers and their streams.
//! - **logger**: the `Logger` handle.
//! - **bridge**: `tracing` layer forwarding ordinary events into the facility.

mod bridge;
mod format;
mod handler;
mod level;
mod logger;
mod schema;

pub use bridge::FacilityLayer;
pub use format::{Formatter, BASIC_FORMAT, DEFAULT_FORMAT};
pub use handler::{FileMode, Handler, HandlerStream, FILE_HANDLER, NULL_HANDLER, STREAM_HANDLER};
pub use level::Level;
pub use logger::Logger;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use crate::error::LogError;
use handler::Record;
use schema::{RawDictConfig, RawHandler, RawLogger};

pub const ROOT_LOGGER: &str = "root";

struct LoggerNode {
    level: Level,
    handlers: Vec<Arc<Handler>>,
    propagate: bool,
    disabled: bool,
}

impl LoggerNode {
    fn new(level: Level) -> Self {
        Self { level, handlers: Vec::new(), propagate: true, disabled: false }
    }
}

pub(crate) struct FacilityState {
    root: LoggerNode,
    loggers: HashMap<String, LoggerNode>,
}

impl FacilityState {
    fn new() -> Self {
        Self { root: LoggerNode::new(Level::WARNING), loggers: HashMap::new() }
    }

    fn node(&self, name: &str) -> Option<&LoggerNode> {
        if is_root(name) {
            Some(&self.root)
        } else {
            self.loggers.get(name)
        }
    }

    /// Nodes from `name` up to the root, skipping names never registered.
    fn chain<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s LoggerNode> + 's {
        let own = if is_root(name) { None } else { Some(name) };
        own.into_iter()
            .chain(ancestors(name))
            .filter_map(move |n| self.loggers.get(n))
            .chain(std::iter::once(&self.root))
    }

    pub(crate) fn effective_level(&self, name: &str) -> Level {
        self.chain(name)
            .map(|node| node.level)
            .find(|level| *level != Level::NOTSET)
            .unwrap_or(Level::NOTSET)
    }

    pub(crate) fn is_disabled(&self, name: &str) -> bool {
        self.node(name).is_some_and(|node| node.disabled)
    }

    pub(crate) fn attached_handlers(&self, name: &str) -> Vec<Arc<Handler>> {
        self.node(name).map(|node| node.handlers.clone()).unwrap_or_default()
    }

    pub(crate) fn call_handlers(&self, name: &str, record: &Record<'_>) {
        let mut found = 0usize;
        for node in self.chain(name) {
            for handler in &node.handlers {
                found += 1;
                handler.handle(record);
            }
            if !node.propagate {
                break;
            }
        }
        if found == 0 && record.level >= Level::WARNING {
            // Last resort: bypasses any stderr redirection.
            let line = format!("{}\n", record.message);
            let _ = crate::redirect::write_real_stderr(line.as_bytes());
        }
    }
}

fn is_root(name: &str) -> bool {
    name.is_empty() || name == ROOT_LOGGER
}

/// Dotted ancestors of `name`, nearest first: `a.b.c` yields `a.b`, `a`.
fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    let mut rest = name;
    std::iter::from_fn(move || {
        let idx = rest.rfind('.')?;
        rest = &rest[..idx];
        Some(rest)
    })
}

/// Options for [`LogFacility::basic_config`].
#[derive(Debug, Clone)]
pub struct BasicConfig {
    pub level: Level,
    pub filename: Option<PathBuf>,
    pub filemode: FileMode,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self { level: Level::WARNING, filename: None, filemode: FileMode::Append }
    }
}

/// Shared handle to a logging registry.
#[derive(Clone)]
pub struct LogFacility {
    state: Arc<RwLock<FacilityState>>,
}

impl Default for LogFacility {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFacility {
    /// An empty facility: root at `WARNING`, no handlers.
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(FacilityState::new())) }
    }

    /// The process-wide facility.
    pub fn global() -> &'static LogFacility {
        static GLOBAL: OnceLock<LogFacility> = OnceLock::new();
        GLOBAL.get_or_init(LogFacility::new)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, FacilityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FacilityState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the logger bound to `name`, registering it on first use.
    /// `""` and `"root"` both name the root logger.
    pub fn logger(&self, name: &str) -> Logger {
        if !is_root(name) && !self.read().loggers.contains_key(name) {
            self.write()
                .loggers
                .entry(name.to_owned())
                .or_insert_with(|| LoggerNode::new(Level::NOTSET));
        }
        Logger::new(if is_root(name) { ROOT_LOGGER } else { name }, self.clone())
    }

    /// Apply a canonical logging mapping.
    ///
    /// Every formatter, handler and logger is built before the registry is
    /// touched, so a rejected configuration leaves the previous one in place.
    pub fn configure(&self, config: &Value) -> Result<(), LogError> {
        let raw: RawDictConfig = serde_json::from_value(config.clone())
            .map_err(|e| LogError::ConfigApply(format!("invalid logging configuration: {e}")))?;

        match &raw.version {
            Some(Value::Number(n)) if n.as_u64() == Some(1) => {}
            Some(other) => {
                return Err(LogError::ConfigApply(format!("unsupported version: {other}")));
            }
            None => {
                return Err(LogError::ConfigApply(
                    "configuration does not specify a version".into(),
                ));
            }
        }
        if raw.incremental {
            return Err(LogError::ConfigApply(
                "incremental configuration is not supported".into(),
            ));
        }

        let mut formatters = BTreeMap::new();
        for (name, spec) in &raw.formatters {
            if spec.style.as_deref().is_some_and(|s| s != "%") {
                return Err(LogError::ConfigApply(format!(
                    "formatter '{name}': only '%' style templates are supported"
                )));
            }
            let template = spec.format.as_deref().unwrap_or(DEFAULT_FORMAT);
            let formatter = Formatter::parse(template, spec.datefmt.as_deref())
                .map_err(|e| LogError::ConfigApply(format!("formatter '{name}': {e}")))?;
            formatters.insert(name.as_str(), formatter);
        }

        let mut handlers = BTreeMap::new();
        for (name, spec) in &raw.handlers {
            let handler = build_handler(name, spec, &formatters)?;
            handlers.insert(name.as_str(), Arc::new(handler));
        }

        let root = raw
            .root
            .as_ref()
            .map(|spec| build_node(ROOT_LOGGER, spec, &handlers))
            .transpose()?;
        let mut configured = HashMap::new();
        for (name, spec) in &raw.loggers {
            configured.insert(name.clone(), build_node(name, spec, &handlers)?);
        }

        {
            let mut state = self.write();
            match root {
                Some(node) => state.root = node,
                None => state.root.handlers.clear(),
            }

            let existing: Vec<String> = state.loggers.keys().cloned().collect();
            for name in existing {
                if configured.contains_key(&name) {
                    continue;
                }
                let under_configured = ancestors(&name).any(|a| configured.contains_key(a));
                if let Some(node) = state.loggers.get_mut(&name) {
                    node.handlers.clear();
                    if under_configured {
                        *node = LoggerNode::new(Level::NOTSET);
                    } else {
                        node.disabled = raw.disable_existing_loggers;
                    }
                }
            }
            state.loggers.extend(configured);
        }

        debug!(
            handlers = raw.handlers.len(),
            loggers = raw.loggers.len(),
            "logging configuration applied"
        );
        Ok(())
    }

    /// Attach a single handler to the root logger, unless it already has one.
    pub fn basic_config(&self, options: BasicConfig) -> Result<(), LogError> {
        let mut state = self.write();
        if !state.root.handlers.is_empty() {
            return Ok(());
        }
        let handler = match &options.filename {
            Some(path) => Handler::file(
                "basic",
                path,
                options.filemode,
                Level::NOTSET,
                Formatter::basic(),
            )?,
            None => Handler::stream("basic", HandlerStream::Stderr, Level::NOTSET, Formatter::basic()),
        };
        state.root.handlers.push(Arc::new(handler));
        state.root.level = options.level;
        Ok(())
    }

    /// A `tracing` layer that forwards events into this facility.
    pub fn tracing_bridge(&self) -> FacilityLayer {
        FacilityLayer::new(self.clone())
    }
}

fn in_scope(scope: &str, err: LogError) -> LogError {
    match err {
        LogError::ConfigApply(msg) => LogError::ConfigApply(format!("{scope}: {msg}")),
        other => other,
    }
}

fn build_handler(
    name: &str,
    spec: &RawHandler,
    formatters: &BTreeMap<&str, Formatter>,
) -> Result<Handler, LogError> {
    let level = spec
        .level
        .as_ref()
        .map(Level::from_value)
        .transpose()
        .map_err(|e| in_scope(&format!("handler '{name}'"), e))?
        .unwrap_or(Level::NOTSET);

    let formatter = match spec.formatter.as_deref() {
        Some(f) => formatters.get(f).cloned().ok_or_else(|| {
            LogError::ConfigApply(format!("handler '{name}': formatter '{f}' is not defined"))
        })?,
        None => Formatter::default(),
    };

    let class = spec
        .class
        .as_deref()
        .ok_or_else(|| LogError::ConfigApply(format!("handler '{name}': missing 'class'")))?;

    match class {
        FILE_HANDLER => {
            let filename = spec.filename.as_deref().ok_or_else(|| {
                LogError::ConfigApply(format!("handler '{name}': missing 'filename'"))
            })?;
            let mode = FileMode::parse(spec.mode.as_deref().unwrap_or("a"))
                .map_err(|e| in_scope(&format!("handler '{name}'"), e))?;
            Handler::file(name, Path::new(filename), mode, level, formatter)
        }
        STREAM_HANDLER => {
            let stream = match spec.stream.as_deref() {
                None | Some("ext://sys.stderr") => HandlerStream::Stderr,
                Some("ext://sys.stdout") => HandlerStream::Stdout,
                Some(other) => {
                    return Err(LogError::ConfigApply(format!(
                        "handler '{name}': unsupported stream '{other}'"
                    )));
                }
            };
            Ok(Handler::stream(name, stream, level, formatter))
        }
        NULL_HANDLER => Ok(Handler::null(name, level)),
        other => Err(LogError::ConfigApply(format!(
            "handler '{name}': unknown handler class '{other}'"
        ))),
    }
}

fn build_node(
    name: &str,
    spec: &RawLogger,
    handlers: &BTreeMap<&str, Arc<Handler>>,
) -> Result<LoggerNode, LogError> {
    let level = spec
        .level
        .as_ref()
        .map(Level::from_value)
        .transpose()
        .map_err(|e| in_scope(&format!("logger '{name}'"), e))?;
    let mut node = LoggerNode::new(level.unwrap_or(if is_root(name) {
        Level::WARNING
    } else {
        Level::NOTSET
    }));
    node.propagate = spec.propagate.unwrap_or(true);
    for h in &spec.handlers {
        let handler = handlers.get(h.as_str()).ok_or_else(|| {
            LogError::ConfigApply(format!("logger '{name}': handler '{h}' is not defined"))
        })?;
        node.handlers.push(Arc::clone(handler));
    }
    Ok(node)
}
