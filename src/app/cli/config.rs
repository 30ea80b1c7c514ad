//! TOML configuration file loading and merging
//!
//! The file is optional. An explicitly named file must exist; otherwise the
//! default location is used when present. Command-line values are applied
//! on top.
//!
//! ```toml
//! [queue-mode]
//! use-in-memory = true
//! use-secondary = true
//! enable-hybrid = true
//!
//! [secondary-sink]
//! enabled = true
//! path = "/var/tmp/topicbroker/messages.jsonl"
//!
//! [broker]
//! poll-interval-ms = 100
//! stop-timeout-ms = 5000
//!
//! [logging]
//! level = "debug"
//! format = "ext"
//! ```

use super::args::Args;
use crate::broker::api::{BrokerSettings, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT};
use crate::hybrid::api::{QueueMode, SecondarySinkSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "topicbroker";
const CONFIG_FILE_NAME: &str = "topicbroker.toml";
const LOG_FORMATS: [&str; 3] = ["text", "ext", "json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub queue_mode: QueueMode,
    pub secondary_sink: SecondarySinkSettings,
    pub broker: BrokerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BrokerSection {
    pub poll_interval_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl Config {
    /// `<config dir>/topicbroker/topicbroker.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load `explicit`, or the default file if it exists, or the defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        Self::from_toml_str(&contents, &path)
    }

    /// Parse configuration text; `path` is only used in error messages
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay command-line values
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(mode) = args.mode {
            self.queue_mode = mode.into();
        }
        if let Some(sink_file) = &args.sink_file {
            self.secondary_sink.enabled = true;
            self.secondary_sink.path = Some(sink_file.clone());
        }
        if let Some(poll_interval_ms) = args.poll_interval_ms {
            self.broker.poll_interval_ms = poll_interval_ms;
        }

        if let Some(level) = &args.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(format) = &args.log_format {
            self.logging.format = Some(format.clone());
        }
        if let Some(file) = &args.log_file {
            // "none" and "-" switch off a file configured in the config file
            if file.as_os_str().eq_ignore_ascii_case("none") || file.as_os_str() == "-" {
                self.logging.file = None;
            } else {
                self.logging.file = Some(file.clone());
            }
        }
        if let Some(color) = args.color_choice() {
            self.logging.color = Some(color);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll-interval-ms must be at least 1".to_string(),
            ));
        }
        if self.broker.stop_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "stop-timeout-ms must be at least 1".to_string(),
            ));
        }
        if !self.secondary_sink.is_valid() {
            return Err(ConfigError::Invalid(
                "secondary sink is enabled but has no path".to_string(),
            ));
        }
        if self.queue_mode.use_secondary && !self.secondary_sink.enabled {
            return Err(ConfigError::Invalid(format!(
                "queue mode '{}' needs a secondary sink; set [secondary-sink] or pass --sink-file",
                self.queue_mode.describe()
            )));
        }
        if let Some(format) = &self.logging.format {
            if !LOG_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown log format '{}' (expected one of: {})",
                    format,
                    LOG_FORMATS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            poll_interval: Duration::from_millis(self.broker.poll_interval_ms),
            stop_timeout: Duration::from_millis(self.broker.stop_timeout_ms),
        }
    }

    /// The sink file to open, if the secondary path is in use
    pub fn sink_path(&self) -> Option<&Path> {
        if self.queue_mode.use_secondary && self.secondary_sink.enabled {
            self.secondary_sink.path.as_deref()
        } else {
            None
        }
    }
}
