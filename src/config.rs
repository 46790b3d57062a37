//! Configuration for FlowState capture and analysis.

use crate::collector::controller::CaptureConfig;
use crate::logging::LoggingConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default capacity of the capture queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for session logs
    pub base_dir: PathBuf,

    /// Which input sources to capture
    pub sources: SourceConfig,

    /// Maximum number of events waiting for the writer
    pub queue_capacity: usize,

    /// How long `stop` waits for the writer to drain (in seconds)
    #[serde(with = "duration_serde")]
    pub stop_timeout: Duration,

    /// IANA time zone for naming session files; host local time when unset
    pub timezone: Option<String>,

    /// Diagnostic log file
    pub log_file: PathBuf,

    /// Diagnostic log level (an `EnvFilter` directive)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowstate");

        Self {
            base_dir: data_dir.join("sessions"),
            sources: SourceConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop_timeout: Duration::from_secs(5),
            timezone: None,
            log_file: data_dir.join("flowstate.log"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowstate")
            .join("config.json")
    }

    /// Parse the configured time zone, if any.
    pub fn tz(&self) -> Result<Option<Tz>, ConfigError> {
        match self.timezone.as_deref() {
            None => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidTimezone(name.to_string())),
        }
    }

    /// Settings for a capture controller.
    pub fn capture_config(&self) -> Result<CaptureConfig, ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(CaptureConfig {
            base_dir: self.base_dir.clone(),
            sources: self.sources.clone(),
            queue_capacity: self.queue_capacity,
            stop_timeout: self.stop_timeout,
            timezone: self.tz()?,
        })
    }

    /// Settings for the diagnostic log.
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            log_file: self.log_file.clone(),
            level: self.log_level.clone(),
            ..LoggingConfig::default()
        }
    }
}

/// Configuration for which input sources to capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub mouse: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            mouse: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            mouse: sources.iter().any(|s| s == "mouse" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.mouse
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(
                "stop_timeout must be a non-negative number of seconds",
            ));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
