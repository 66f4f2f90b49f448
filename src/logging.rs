use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use grovr::config::Config;

const MAX_LOG_LINES: usize = 1000;
const KEEP_LOG_LINES: usize = 750;

/// Trim the log file to its most recent lines once it grows too long.
pub fn rotate_log(config: &Config) {
    let content = match std::fs::read_to_string(&config.log_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= MAX_LOG_LINES {
        return;
    }

    let trimmed = lines[lines.len() - KEEP_LOG_LINES..].join("\n");
    let _ = std::fs::write(&config.log_path, format!("{}\n", trimmed));
}

/// File-based logging to `~/.grovr/grovr.log`.
///
/// Default level: DEBUG for grovr, WARN for dependencies. Nothing goes to
/// stderr so the terminal UI stays intact.
pub fn setup_logging(config: &Config) -> Result<()> {
    config.ensure_dirs()?;

    let log_file = open_log_file(&config.log_path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grovr=debug,warn"));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    tracing::debug!("Logging initialized, writing to {}", config.log_path.display());

    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}
