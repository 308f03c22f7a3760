//! Logger handles.

use std::fmt::Display;
use std::sync::Arc;

use super::handler::{Handler, Record};
use super::level::Level;
use super::LogFacility;

/// A named handle into a [`LogFacility`].
///
/// Handles are cheap to clone and always read the facility's current
/// configuration, so a logger obtained before a reconfiguration follows it.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    facility: LogFacility,
}

impl Logger {
    pub(super) fn new(name: &str, facility: LogFacility) -> Self {
        Self { name: Arc::from(name), facility }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level used for filtering: the first explicit level found walking from
    /// this logger up to the root.
    pub fn effective_level(&self) -> Level {
        self.facility.read().effective_level(&self.name)
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        let state = self.facility.read();
        !state.is_disabled(&self.name) && level >= state.effective_level(&self.name)
    }

    /// Handlers attached directly to this logger, in attachment order.
    /// Ancestor handlers reached through propagation are not included.
    pub fn handlers(&self) -> Vec<Arc<Handler>> {
        self.facility.read().attached_handlers(&self.name)
    }

    pub fn log(&self, level: Level, message: impl Display) {
        let state = self.facility.read();
        if state.is_disabled(&self.name) || level < state.effective_level(&self.name) {
            return;
        }
        let message = message.to_string();
        state.call_handlers(
            &self.name,
            &Record { logger: &self.name, level, message: &message },
        );
    }

    pub fn debug(&self, message: impl Display) {
        self.log(Level::DEBUG, message);
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::INFO, message);
    }

    pub fn warning(&self, message: impl Display) {
        self.log(Level::WARNING, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::ERROR, message);
    }

    pub fn critical(&self, message: impl Display) {
        self.log(Level::CRITICAL, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.effective_level())
            .finish()
    }
}
