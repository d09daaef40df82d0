//! Global `tracing` subscriber setup.
//!
//! The filter comes from `TRENDPILOT_LOG`, then `RUST_LOG`, then `info`.
//! `TRENDPILOT_LOG_FORMAT=json` switches to one JSON object per event.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// Install the global subscriber. With `log_file` set, output is appended
/// to that file without ANSI colours.
///
/// A second call keeps the first subscriber.
pub fn init(log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = env_filter();
    let format = log_format();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match log_file {
        None => match format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Plain => builder.try_init(),
        },
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::File {
                    path: path.to_path_buf(),
                    source,
                })?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            match format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Plain => builder.try_init(),
            }
        }
    };

    if let Err(err) = result {
        tracing::debug!(%err, "global subscriber already installed; keeping it");
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::new(filter_directive(
        std::env::var("TRENDPILOT_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    ))
}

fn filter_directive(own: Option<String>, rust_log: Option<String>) -> String {
    own.filter(|value| !value.trim().is_empty())
        .or(rust_log)
        .unwrap_or_else(|| "info".to_string())
}

fn log_format() -> LogFormat {
    LogFormat::parse(std::env::var("TRENDPILOT_LOG_FORMAT").ok().as_deref())
}
