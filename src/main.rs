//! dataflow-log: check a logging configuration the way a dataflow script
//! would load it.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args (flags > `DATAFLOW_LOG_CONFIG` / `DATAFLOW_LOG_FILE`).
//!      `--log-config` may repeat; the files are deep-merged in order.
//!   3. Route `tracing` events into the global logging facility
//!   4. Plan the resolution, optionally dumping the canonical configuration
//!   5. Apply it and take over standard error and the panic hook
//!   6. Emit a readiness record and exit

use std::path::PathBuf;

use serde_json::{json, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dataflow_log::bootstrap::{ConfigInput, Plan, Resolver, DEFAULT_LOGGER};
use dataflow_log::config::{expand_home, read_from_all};
use dataflow_log::error::LogError;
use dataflow_log::facility::LogFacility;
use dataflow_log::redirect::DiagnosticRedirection;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), LogError> {
    // Load .env if present. The file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let facility = LogFacility::global();

    tracing_subscriber::registry()
        .with(facility.tracing_bridge())
        .try_init()
        .map_err(|e| LogError::ConfigApply(format!("failed to set subscriber: {e}")))?;

    let input = match args.log_config.as_slice() {
        // No configuration at all takes the fallback path.
        [] => ConfigInput::classify(json!({ "options": {} }))?,
        [source] => config_input(source)?,
        sources => merged_input(sources)?,
    };

    let resolver = Resolver::new(facility).fallback_name(args.logger.as_str());
    let plan = resolver.plan(input, args.log_file.as_deref())?;
    if args.dump {
        if let Plan::Structured { config, .. } = &plan {
            let text = serde_json::to_string_pretty(config.as_value())
                .map_err(|e| LogError::ConfigLoad(format!("cannot render configuration: {e}")))?;
            println!("{text}");
        } else {
            println!("(fallback: no structured logging configuration)");
        }
    }

    let logger = resolver.apply(plan)?;
    DiagnosticRedirection::install(&logger)?.persist();

    logger.info(format_args!(
        "logging ready: logger={} level={} handlers={}",
        logger.name(),
        logger.effective_level(),
        logger.handlers().len()
    ));
    Ok(())
}

/// Inline JSON when the argument looks like a mapping, a path otherwise.
fn config_input(source: &str) -> Result<ConfigInput, LogError> {
    if source.trim_start().starts_with('{') {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| LogError::ConfigLoad(format!("invalid inline configuration: {e}")))?;
        ConfigInput::classify(value)
    } else {
        Ok(ConfigInput::Path(expand_home(source)))
    }
}

/// Several sources must all be files; they are merged into one mapping.
fn merged_input(sources: &[String]) -> Result<ConfigInput, LogError> {
    if let Some(inline) = sources.iter().find(|s| s.trim_start().starts_with('{')) {
        return Err(LogError::ConfigLoad(format!(
            "inline configuration cannot be merged with other sources: {inline}"
        )));
    }
    let paths: Vec<PathBuf> = sources.iter().map(|s| expand_home(s)).collect();
    ConfigInput::classify(read_from_all(&paths)?)
}

struct CliArgs {
    log_config: Vec<String>,
    log_file: Option<PathBuf>,
    logger: String,
    dump: bool,
}

fn parse_cli_args() -> CliArgs {
    let mut log_config = Vec::new();
    let mut log_file = std::env::var("DATAFLOW_LOG_FILE").ok();
    let mut logger = DEFAULT_LOGGER.to_string();
    let mut dump = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: dataflow-log [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -c, --log-config <SOURCE>  Logging configuration: a file path or inline JSON (repeatable for files)");
                println!("  -l, --log <PATH>           Log file; its directory is created if missing");
                println!("  -n, --logger <NAME>        Logger name when the configuration names none (default: prod)");
                println!("  -d, --dump                 Print the canonical configuration before applying it");
                std::process::exit(0);
            }
            "-c" | "--log-config" => log_config.push(required_value(&mut iter, &arg)),
            "-l" | "--log" => log_file = Some(required_value(&mut iter, &arg)),
            "-n" | "--logger" => logger = required_value(&mut iter, &arg),
            "-d" | "--dump" => dump = true,
            _ => {}
        }
    }

    if log_config.is_empty() {
        log_config.extend(std::env::var("DATAFLOW_LOG_CONFIG").ok());
    }

    CliArgs {
        log_config,
        log_file: log_file.map(|p| expand_home(&p)),
        logger,
        dump,
    }
}

fn required_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> String {
    match iter.next() {
        Some(value) => value,
        None => {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}
