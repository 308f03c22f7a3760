//! The resolution-and-wiring procedure.
//!
//! [`Resolver::plan`] turns a configuration input into a [`Plan`] without
//! touching the facility; [`Resolver::build`] applies it; [`Resolver::resolve`]
//! additionally takes over standard error and the panic hook.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::builder::{LogConfig, DATAFLOW_HANDLER};
use super::input::{ConfigInput, LogSource};
use crate::config;
use crate::error::LogError;
use crate::facility::{BasicConfig, FileMode, Level, LogFacility, Logger};
use crate::redirect::DiagnosticRedirection;

/// Logger name used when the input does not name one.
pub const DEFAULT_LOGGER: &str = "prod";

/// What a resolution will do once applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// A canonical configuration to apply, and the logger to hand out.
    Structured { config: LogConfig, log_file: Option<PathBuf>, logger: String },
    /// No structured configuration: basic file logging when a log file is
    /// given, nothing otherwise.
    Fallback { log_file: Option<PathBuf>, logger: String },
}

impl Plan {
    pub fn logger_name(&self) -> &str {
        match self {
            Plan::Structured { logger, .. } | Plan::Fallback { logger, .. } => logger,
        }
    }
}

/// Binds the procedure to a facility and a fallback logger name.
pub struct Resolver<'f> {
    facility: &'f LogFacility,
    fallback_name: String,
}

impl<'f> Resolver<'f> {
    pub fn new(facility: &'f LogFacility) -> Self {
        Self { facility, fallback_name: DEFAULT_LOGGER.to_owned() }
    }

    pub fn fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    /// Normalize `input` and inject defaults. Reads a configuration file when
    /// the logging configuration is given as a path.
    pub fn plan(&self, input: ConfigInput, log_file: Option<&Path>) -> Result<Plan, LogError> {
        let envelope = input.into_envelope()?;
        let Some(source) = envelope.logging else {
            debug!(logger = %self.fallback_name, "no structured logging configuration, using fallback");
            return Ok(Plan::Fallback {
                log_file: log_file.map(Path::to_path_buf),
                logger: self.fallback_name.clone(),
            });
        };

        let mut config = match source {
            LogSource::Path(path) => LogConfig::new(config::read_from(&path)?),
            LogSource::Inline(value) => LogConfig::new(value),
        };
        if let Some(log_file) = log_file {
            if config.is_mapping() {
                config = config
                    .ensure_handler(DATAFLOW_HANDLER, log_file)
                    .ensure_version()
                    .ensure_root_if_absent(DATAFLOW_HANDLER);
            }
        }

        Ok(Plan::Structured {
            config,
            log_file: log_file.map(Path::to_path_buf),
            logger: envelope.logger.unwrap_or_else(|| self.fallback_name.clone()),
        })
    }

    /// Apply a plan to the facility and return the resolved logger.
    pub fn apply(&self, plan: Plan) -> Result<Logger, LogError> {
        match plan {
            Plan::Structured { config, log_file, logger } => {
                if let Some(log_file) = &log_file {
                    ensure_parent_dir(log_file)?;
                }
                self.facility.configure(config.as_value())?;
                debug!(logger = %logger, "structured logging configuration applied");
                Ok(self.facility.logger(&logger))
            }
            Plan::Fallback { log_file, logger } => {
                if let Some(log_file) = log_file {
                    ensure_parent_dir(&log_file)?;
                    self.facility.basic_config(BasicConfig {
                        level: Level::INFO,
                        filename: Some(log_file),
                        filemode: FileMode::Truncate,
                    })?;
                }
                Ok(self.facility.logger(&logger))
            }
        }
    }

    /// Plan and apply, leaving process-wide diagnostic state untouched.
    pub fn build(&self, input: ConfigInput, log_file: Option<&Path>) -> Result<Logger, LogError> {
        let plan = self.plan(input, log_file)?;
        self.apply(plan)
    }

    /// Build the logger and redirect stderr and the panic hook to it for the
    /// rest of the process.
    pub fn resolve(&self, input: ConfigInput, log_file: Option<&Path>) -> Result<Logger, LogError> {
        let (logger, redirection) = self.resolve_scoped(input, log_file)?;
        redirection.persist();
        Ok(logger)
    }

    /// Like [`Resolver::resolve`], but hands back the redirection record so the
    /// caller decides when to restore the previous state.
    pub fn resolve_scoped(
        &self,
        input: ConfigInput,
        log_file: Option<&Path>,
    ) -> Result<(Logger, DiagnosticRedirection), LogError> {
        let logger = self.build(input, log_file)?;
        let redirection = DiagnosticRedirection::install(&logger)?;
        Ok((logger, redirection))
    }
}

/// Resolve against the process-wide facility with the default fallback name.
pub fn resolve(input: ConfigInput, log_file: Option<&Path>) -> Result<Logger, LogError> {
    Resolver::new(LogFacility::global()).resolve(input, log_file)
}

/// Create the parent directory of `path`. Existing directories are fine.
fn ensure_parent_dir(path: &Path) -> Result<(), LogError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).map_err(|e| {
            LogError::Filesystem(format!("cannot create log directory {}: {e}", parent.display()))
        }),
        _ => Ok(()),
    }
}
