//! Forward ordinary `tracing` events into a [`LogFacility`].
//!
//! Install the layer as part of the global subscriber and every `info!`,
//! `error!`, … in the process reaches the configured handlers. The event
//! target becomes the logger name with `::` rewritten to `.`, so module
//! paths slot into the dotted logger hierarchy.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::level::Level;
use super::LogFacility;

pub struct FacilityLayer {
    facility: LogFacility,
}

impl FacilityLayer {
    pub(super) fn new(facility: LogFacility) -> Self {
        Self { facility }
    }
}

/// Collects `message` and renders remaining fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

impl<S: Subscriber> Layer<S> for FacilityLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let name = metadata.target().replace("::", ".");
        let level = Level::from_tracing(*metadata.level());
        self.facility
            .logger(&name)
            .log(level, format_args!("{}{}", visitor.message, visitor.fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn events_reach_configured_handlers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.log");
        let facility = LogFacility::new();
        facility
            .configure(&json!({
                "version": 1,
                "formatters": {"f": {"format": "%(name)s:%(levelname)s:%(message)s"}},
                "handlers": {
                    "file": {
                        "class": "logging.FileHandler",
                        "formatter": "f",
                        "filename": path.to_string_lossy()
                    }
                },
                "root": {"level": "INFO", "handlers": ["file"]}
            }))
            .unwrap();

        let subscriber = tracing_subscriber::registry().with(facility.tracing_bridge());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "pipeline::nopt", n_events = 42, "baselines selected");
            tracing::debug!(target: "pipeline::nopt", "below root level");
        });

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "pipeline.nopt:INFO:baselines selected n_events=42\n");
    }
}
