//! End-to-end resolution against private facilities.
//!
//! Every test installs the process-wide redirection through
//! `resolve_scoped`, so they serialize on one lock and restore on exit.
//! Restoring waits until everything written to standard error has been
//! logged.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde_json::json;
use tempfile::TempDir;

use dataflow_log::bootstrap::{ConfigInput, Resolver};
use dataflow_log::error::LogError;
use dataflow_log::facility::{HandlerStream, Level, LogFacility};

static GLOBAL_STATE: Mutex<()> = Mutex::new(());

fn input(value: serde_json::Value) -> ConfigInput {
    ConfigInput::classify(value).unwrap()
}

#[test]
fn log_file_gets_stderr_lines_as_errors() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("logs/nopt.log");
    let facility = LogFacility::new();

    let (logger, redirection) = Resolver::new(&facility)
        .resolve_scoped(input(json!({})), Some(&log_file))
        .unwrap();
    logger.info("Select baselines 5000");
    io::stderr().write_all(b"RuntimeWarning: overflow  \n\n   in exp\n").unwrap();
    redirection.restore();

    let text = std::fs::read_to_string(&log_file).unwrap();
    assert_eq!(text, "Select baselines 5000\nRuntimeWarning: overflow\n   in exp\n");
}

#[test]
fn writes_from_other_threads_are_captured() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("threads.log");
    let facility = LogFacility::new();

    let (_logger, redirection) = Resolver::new(&facility)
        .resolve_scoped(input(json!({})), Some(&log_file))
        .unwrap();
    std::thread::spawn(|| io::stderr().write_all(b"from a worker\n").unwrap())
        .join()
        .unwrap();
    redirection.restore();

    assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "from a worker\n");
}

#[test]
fn envelope_names_the_logger_and_keeps_explicit_root() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("run.log");
    let facility = LogFacility::new();
    let envelope = json!({
        "options": {
            "logger": "nopt",
            "logging": {
                "version": 1,
                "root": {"level": "WARNING", "handlers": []},
                "loggers": {"nopt": {"level": "DEBUG", "handlers": ["dataflow"]}}
            }
        }
    });

    let (logger, redirection) = Resolver::new(&facility)
        .resolve_scoped(input(envelope), Some(&log_file))
        .unwrap();
    redirection.restore();

    assert_eq!(logger.name(), "nopt");
    assert_eq!(logger.effective_level(), Level::DEBUG);
    assert!(facility.logger("root").handlers().is_empty());
    let handlers = logger.handlers();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].name(), "dataflow");
    assert_eq!(handlers[0].filename(), Some(log_file.as_path()));
}

#[test]
fn panic_report_lands_in_the_named_loggers_file() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("panic.log");
    let facility = LogFacility::new();
    let envelope = json!({
        "options": {
            "logger": "prod",
            "logging": {"loggers": {"prod": {"handlers": ["dataflow"]}}}
        }
    });

    let (_logger, redirection) = Resolver::new(&facility)
        .resolve_scoped(input(envelope), Some(&log_file))
        .unwrap();
    assert!(matches!(redirection.exception_stream(), HandlerStream::File(_)));
    let outcome = std::panic::catch_unwind(|| panic!("energy calibration failed"));
    redirection.restore();

    assert!(outcome.is_err());
    let text = std::fs::read_to_string(&log_file).unwrap();
    assert!(text.contains("energy calibration failed"), "{text}");
    assert!(text.contains("stack backtrace:"), "{text}");
}

#[test]
fn root_only_wiring_sends_panics_to_stdout() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let facility = LogFacility::new();

    let (logger, redirection) = Resolver::new(&facility)
        .resolve_scoped(input(json!({})), Some(&dir.path().join("root.log")))
        .unwrap();

    // The synthesized root owns the file handler; "prod" has none of its own.
    assert!(logger.handlers().is_empty());
    assert!(matches!(redirection.exception_stream(), HandlerStream::Stdout));
    redirection.restore();
}

#[test]
fn config_file_path_is_loaded() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().join("logging.toml");
    let log_file = dir.path().join("from-toml.log");
    std::fs::write(
        &cfg,
        r#"
version = 1

[formatters.plain]
format = "%(name)s - %(levelname)s - %(message)s"

[handlers.dataflow]
formatter = "plain"
level = "DEBUG"
"#,
    )
    .unwrap();

    let (logger, redirection) = Resolver::new(&LogFacility::new())
        .resolve_scoped(ConfigInput::Path(cfg), Some(&log_file))
        .unwrap();
    logger.debug("tau = 12.5 us");
    redirection.restore();

    let text = std::fs::read_to_string(&log_file).unwrap();
    assert_eq!(text, "prod - DEBUG - tau = 12.5 us\n");
}

#[test]
fn missing_config_file_installs_nothing() {
    let _guard = GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("never/created.log");
    let facility = LogFacility::new();

    let err = Resolver::new(&facility)
        .resolve_scoped(ConfigInput::Path(dir.path().join("missing.json")), Some(&log_file))
        .unwrap_err();

    assert!(matches!(err, LogError::ConfigLoad(_)));
    assert!(!log_file.parent().is_some_and(Path::exists));
    assert!(facility.logger("root").handlers().is_empty());
}
