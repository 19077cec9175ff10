use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureHints;
use crate::position::ValidationConfig;
use crate::tracker::TrackerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    pub base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_send_timeout", deserialize_with = "humantime_duration")]
    pub send_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            send_timeout: default_send_timeout(),
        }
    }
}

fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_CAPACITY
}

fn default_batch_size() -> usize {
    crate::sync::DEFAULT_BATCH_SIZE
}

fn default_send_timeout() -> Duration {
    crate::delivery::DEFAULT_SEND_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_foreground_interval", deserialize_with = "humantime_duration")]
    pub foreground_interval: Duration,
    #[serde(default = "default_background_interval", deserialize_with = "humantime_duration")]
    pub background_interval: Duration,
    #[serde(default = "default_min_distance")]
    pub min_distance_m: f64,
    #[serde(default = "default_true")]
    pub background_enabled: bool,
    #[serde(
        default = "default_registration_timeout",
        deserialize_with = "humantime_duration"
    )]
    pub registration_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            foreground_interval: default_foreground_interval(),
            background_interval: default_background_interval(),
            min_distance_m: default_min_distance(),
            background_enabled: true,
            registration_timeout: default_registration_timeout(),
        }
    }
}

fn default_foreground_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_background_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_min_distance() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn default_registration_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for persisted state. Without it nothing survives a restart.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Period of the background flush; disabled when absent.
    #[serde(default, deserialize_with = "optional_humantime_duration")]
    pub interval: Option<Duration>,
}

fn humantime_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

fn optional_humantime_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.collector.base_url.trim().is_empty() {
            return invalid("collector.base_url must not be empty");
        }
        if self.agent.queue_capacity == 0 {
            return invalid("agent.queue_capacity must be at least 1");
        }
        if self.agent.batch_size == 0 {
            return invalid("agent.batch_size must be at least 1");
        }
        if self.agent.send_timeout.is_zero() {
            return invalid("agent.send_timeout must be positive");
        }
        if self.validation.accuracy_threshold_m <= 0.0 || self.validation.max_jump_m <= 0.0 {
            return invalid("validation thresholds must be positive");
        }
        if matches!(self.sync.interval, Some(d) if d.is_zero()) {
            return invalid("sync.interval must be positive");
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            validation: self.validation,
            queue_capacity: self.agent.queue_capacity,
            batch_size: self.agent.batch_size,
            send_timeout: self.agent.send_timeout,
            foreground: CaptureHints {
                interval: self.capture.foreground_interval,
                min_distance_m: self.capture.min_distance_m,
            },
            background: CaptureHints {
                interval: self.capture.background_interval,
                min_distance_m: self.capture.min_distance_m,
            },
            registration_timeout: self.capture.registration_timeout,
        }
    }
}
