//! Process-wide diagnostic logging.
//!
//! Diagnostics go through `tracing`. [`init_logging`] installs the global
//! subscriber once, writing to a log file and (optionally) to stderr. Later
//! calls with the same name return the same handle and apply the new level to
//! every output.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Timestamp format of log lines.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Settings for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Name identifying this logging setup
    pub name: String,
    pub log_file: PathBuf,
    /// An `EnvFilter` directive such as `info` or `flowstate_sensor=debug`
    pub level: String,
    /// Also log to stderr
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "flowstate".to_string(),
            log_file: PathBuf::from("flowstate.log"),
            level: "info".to_string(),
            console: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level {0:?}")]
    InvalidLevel(String),

    #[error("Logging already configured as {existing:?}, cannot configure {requested:?}")]
    NameConflict { existing: String, requested: String },

    #[error("Could not open log file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Install(String),

    #[error("Failed to change log level: {0}")]
    Reload(String),
}

/// The installed logging setup.
pub struct LoggingHandle {
    name: String,
    log_file: PathBuf,
    level: Mutex<String>,
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LoggingHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// The level directive currently applied.
    pub fn level(&self) -> String {
        self.level
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the level of all outputs.
    pub fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        let filter = parse_filter(level)?;
        self.filter
            .reload(filter)
            .map_err(|e| LoggingError::Reload(e.to_string()))?;
        *self.level.lock().unwrap_or_else(PoisonError::into_inner) = level.to_string();
        Ok(())
    }
}

static LOGGING: OnceLock<LoggingHandle> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

fn parse_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

/// Install (or re-tune) the global logging setup.
pub fn init_logging(config: &LoggingConfig) -> Result<&'static LoggingHandle, LoggingError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(handle) = LOGGING.get() {
        if handle.name != config.name {
            return Err(LoggingError::NameConflict {
                existing: handle.name.clone(),
                requested: config.name.clone(),
            });
        }
        handle.set_level(&config.level)?;
        return Ok(handle);
    }

    let filter = parse_filter(&config.level)?;

    let file_error = |source| LoggingError::File {
        path: config.log_file.clone(),
        source,
    };
    if let Some(parent) = config.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(file_error)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(file_error)?;

    let (filter_layer, filter_handle) = reload::Layer::new(filter);

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(ChronoLocal::new(DATE_FORMAT.to_string()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = config.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(ChronoLocal::new(DATE_FORMAT.to_string()))
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(LOGGING.get_or_init(|| LoggingHandle {
        name: config.name.clone(),
        log_file: config.log_file.clone(),
        level: Mutex::new(config.level.clone()),
        filter: filter_handle,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The subscriber is process-global, so the whole lifecycle lives in one test.
    #[test]
    fn test_init_logging_once_per_process() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            name: "flowstate-test".to_string(),
            log_file: tmp.path().join("logs").join("test.log"),
            level: "info".to_string(),
            console: false,
        };

        assert!(matches!(
            init_logging(&LoggingConfig {
                level: "flowstate=loud".to_string(),
                ..config.clone()
            }),
            Err(LoggingError::InvalidLevel(_))
        ));

        let first = init_logging(&config).unwrap();
        assert_eq!(first.name(), "flowstate-test");
        assert_eq!(first.log_file(), config.log_file.as_path());
        tracing::info!("logging ready");
        tracing::debug!("hidden at info");

        let second = init_logging(&LoggingConfig {
            level: "debug".to_string(),
            ..config.clone()
        })
        .unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.level(), "debug");
        tracing::debug!("visible at debug");

        let conflict = init_logging(&LoggingConfig {
            name: "someone-else".to_string(),
            ..config.clone()
        });
        assert!(matches!(conflict, Err(LoggingError::NameConflict { .. })));

        let content = std::fs::read_to_string(&config.log_file).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("logging ready"));
        assert!(!content.contains("hidden at info"));
        assert!(content.contains("visible at debug"));
        assert!(content.contains("logging.rs:"));
        assert!(!content.contains('\u{1b}'));
    }
}
