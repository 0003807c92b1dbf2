//! Logging setup for gator.
//!
//! The level comes from `[logging] level` unless `RUST_LOG` is set, in which
//! case its directives win. Output goes to the console and, when
//! `[logging] file` is configured, is appended to that file as well.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{GatorError, Result};

/// Dependencies that are chatty below `warn`.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"];

/// Build the event filter from a configured level and optional `RUST_LOG`
/// directives.
fn build_filter(level: &str, env_directives: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = env_directives.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directives).map_err(|e| {
            GatorError::Config(format!("invalid {}: {e}", EnvFilter::DEFAULT_ENV))
        });
    }

    let level = match level.trim().to_ascii_lowercase().as_str() {
        "warning" => LevelFilter::WARN,
        other => other
            .parse::<LevelFilter>()
            .map_err(|_| GatorError::Config(format!("unknown log level: {level}")))?,
    };

    let mut filter = EnvFilter::default().add_directive(level.into());
    for target in QUIET_TARGETS {
        let directive: Directive = target
            .parse()
            .map_err(|e| GatorError::Config(format!("invalid directive {target}: {e}")))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn env_directives() -> Option<String> {
    std::env::var(EnvFilter::DEFAULT_ENV).ok()
}

fn open_log_file(path: &str) -> Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber described by `config`.
///
/// Fails on an unknown level, bad `RUST_LOG` directives, an unwritable log
/// file, or when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level, env_directives().as_deref())?;

    let file_layer = match &config.file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Arc::new(open_log_file(path)?))
                .with_ansi(false),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| GatorError::Config(format!("failed to install logger: {e}")))
}

/// Console logging used when [`init`] fails. Falls back to `info` if the
/// level cannot be used.
pub fn init_console_only(level: &str) {
    let filter = build_filter(level, env_directives().as_deref())
        .or_else(|_| build_filter("info", None))
        .unwrap_or_default();

    // A subscriber installed earlier keeps running.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .try_init();
}
