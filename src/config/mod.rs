// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Configuration module

pub mod duration;
mod watcher;

pub use watcher::ConfigWatcher;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker connection and topics
    pub mqtt: MqttConfig,

    /// Frigate API location, used for media links
    pub frigate: FrigateConfig,

    /// Global alerting rules
    pub rules: AlertRules,

    /// Per-camera alert policies
    pub cameras: Vec<CameraPolicy>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {:?}", path))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing configuration {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject configurations the engine cannot act on sensibly
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.listen_topic.trim().is_empty() {
            bail!("mqtt.listen_topic must not be empty");
        }
        if self.mqtt.alert_topic.trim().is_empty() {
            bail!("mqtt.alert_topic must not be empty");
        }

        let mut seen = HashSet::new();
        for policy in &self.cameras {
            if policy.camera.trim().is_empty() {
                bail!("camera policy with an empty camera name");
            }
            if !seen.insert(policy.camera.as_str()) {
                bail!("camera {:?} is configured more than once", policy.camera);
            }
            for rule in policy.zones.require.iter().chain(&policy.zones.ignore) {
                if rule.zone.trim().is_empty() {
                    bail!("camera {:?} has a zone rule with an empty zone name", policy.camera);
                }
            }
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("frigate-alerts"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client id; a random suffix is appended when empty
    pub client_id: String,
    /// Optional broker user
    pub username: Option<String>,
    /// Password for `username`
    pub password: Option<String>,
    /// MQTT keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Topic Frigate publishes lifecycle events on
    pub listen_topic: String,
    /// Prefix for `<alert_topic>/alert` and `<alert_topic>/status`
    pub alert_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "frigate-alerts".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            listen_topic: "frigate/events".to_string(),
            alert_topic: "frigate_alerts".to_string(),
        }
    }
}

impl MqttConfig {
    /// Topic alerts are published on
    pub fn alert_publish_topic(&self) -> String {
        format!("{}/alert", self.alert_topic)
    }

    /// Retained `online` / `offline` status topic
    pub fn status_topic(&self) -> String {
        format!("{}/status", self.alert_topic)
    }
}

/// Frigate API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrigateConfig {
    /// Frigate host name or address
    pub host: String,
    /// Frigate HTTP port
    pub port: u16,
    /// Use https for media links
    pub ssl: bool,
}

impl Default for FrigateConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            ssl: false,
        }
    }
}

impl FrigateConfig {
    /// Base URL of the Frigate HTTP API, without a trailing slash
    pub fn api_base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}/api", scheme, self.host, self.port)
    }
}

/// Global alerting rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    /// Events are held back until they have existed this long
    #[serde(with = "duration")]
    pub minimum_duration: Duration,

    /// Events older than this are stale and never alert; zero disables
    #[serde(with = "duration")]
    pub maximum_duration: Duration,

    /// Only alert once a snapshot is available
    pub require_snapshot: bool,
    /// Only alert once a clip is available
    pub require_video: bool,
    /// Suppression windows after an alert
    pub cooldown: CooldownConfig,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            minimum_duration: Duration::ZERO,
            maximum_duration: Duration::ZERO,
            require_snapshot: false,
            require_video: false,
            cooldown: CooldownConfig::default(),
        }
    }
}

/// Alert suppression windows; zero disables a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Minimum gap between two alerts on the same camera
    #[serde(with = "duration")]
    pub camera: Duration,

    /// Minimum gap between two alerts for the same camera and label
    #[serde(with = "duration")]
    pub label: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            camera: Duration::from_secs(60),
            label: Duration::from_secs(60),
        }
    }
}

/// Matches any label in `labels` lists
pub const WILDCARD: &str = "*";

/// Alert policy for one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPolicy {
    /// Camera name as Frigate reports it
    pub camera: String,

    /// When false the camera never alerts
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Labels allowed to alert; `"*"` admits every label
    #[serde(default)]
    pub labels: Vec<String>,

    /// Required and ignored zone rules
    #[serde(default)]
    pub zones: ZoneRules,
}

fn enabled_by_default() -> bool {
    true
}

impl CameraPolicy {
    /// Enabled policy admitting `labels`, with no zone rules
    pub fn new(camera: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            camera: camera.into(),
            enabled: true,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            zones: ZoneRules::default(),
        }
    }

    /// Whether `label` may alert on this camera
    pub fn allows_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == WILDCARD || l == label)
    }
}

/// Zone gates for a camera
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRules {
    /// Event must be in one of these zones; empty imposes nothing
    #[serde(default)]
    pub require: Vec<ZoneRule>,

    /// Event must not be in any of these zones
    #[serde(default)]
    pub ignore: Vec<ZoneRule>,
}

/// A zone and the labels it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRule {
    /// Zone name as configured in Frigate
    pub zone: String,
    /// Labels the rule applies to; `"*"` or empty means all
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ZoneRule {
    /// Rule for `zone` covering `labels`
    pub fn new(zone: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            zone: zone.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Also append log lines to this file
    pub path: Option<PathBuf>,
    /// Roll the log file over once it reaches [`MAX_LOG_BYTES`]
    pub rotate: bool,
    /// Rolled-over files to keep (`<path>.1` is the newest)
    pub max_keep: usize,
}

/// Size at which a rotating log file is rolled over
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

impl LoggingConfig {
    /// Byte limit for the log file, `0` when it never rolls over
    pub fn max_bytes(&self) -> u64 {
        if self.rotate && self.max_keep > 0 {
            MAX_LOG_BYTES
        } else {
            0
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
            rotate: true,
            max_keep: 10,
        }
    }
}

/// Immutable snapshot of everything the engine decides with.
///
/// Built once per (re)load so the engine never sees a half-applied config.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Global alert rules
    pub rules: AlertRules,
    /// Camera policies keyed by camera name
    pub cameras: HashMap<String, CameraPolicy>,
    /// Full topic alerts are published to
    pub alert_topic: String,
    /// Base URL for image and clip links
    pub api_base_url: String,
}

impl Settings {
    /// Snapshot the engine-relevant parts of `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            rules: config.rules.clone(),
            cameras: config
                .cameras
                .iter()
                .map(|policy| (policy.camera.clone(), policy.clone()))
                .collect(),
            alert_topic: config.mqtt.alert_publish_topic(),
            api_base_url: config.frigate.api_base_url(),
        }
    }

    /// Policy for `camera`, `None` when it is not configured
    pub fn policy(&self, camera: &str) -> Option<&CameraPolicy> {
        self.cameras.get(camera)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
