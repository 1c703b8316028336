use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

use crate::devices::Thresholds;
use crate::transport::{Qos, TopicKind};

/// Environment variable naming the config file when none is passed on the CLI
pub const CONFIG_ENV: &str = "DRIVE_MONITOR_CONFIG";

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Broker connection settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// A random suffix is appended per process
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default)]
    pub topics: TopicConfig,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Fixed pause between reconnection attempts
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Capacity of the channel between the transport and the dispatcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl MqttConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id_prefix: default_client_id_prefix(),
            username: None,
            password: None,
            topics: TopicConfig::default(),
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Topic names used on the broker
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TopicConfig {
    #[serde(default = "default_alerts_topic")]
    pub alerts: String,

    #[serde(default = "default_telemetry_topic")]
    pub telemetry: String,

    #[serde(default = "default_status_topic")]
    pub status: String,

    /// Prefix of per-device command topics (`<commands>/<device_id>`)
    #[serde(default = "default_commands_topic")]
    pub commands: String,
}

impl TopicConfig {
    /// Classify an inbound topic
    pub fn classify(&self, topic: &str) -> Option<TopicKind> {
        if topic == self.alerts {
            Some(TopicKind::Alerts)
        } else if topic == self.telemetry {
            Some(TopicKind::Telemetry)
        } else if topic == self.status {
            Some(TopicKind::Status)
        } else {
            None
        }
    }

    /// Subscriptions with their delivery guarantee
    pub fn subscriptions(&self) -> [(&str, Qos); 3] {
        [
            (self.alerts.as_str(), Qos::AtLeastOnce),
            (self.telemetry.as_str(), Qos::AtMostOnce),
            (self.status.as_str(), Qos::AtLeastOnce),
        ]
    }

    pub fn command_topic(&self, device_id: &str) -> String {
        format!("{}/{}", self.commands, device_id)
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            alerts: default_alerts_topic(),
            telemetry: default_telemetry_topic(),
            status: default_status_topic(),
            commands: default_commands_topic(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DefaultsConfig {
    /// Thresholds given to a device first seen through an alert or telemetry
    #[serde(default = "default_thresholds")]
    pub thresholds: Thresholds,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
        }
    }
}

fn default_mqtt_host() -> String {
    String::from("localhost")
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id_prefix() -> String {
    String::from("driving-monitor-bridge")
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    4
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    256
}

fn default_alerts_topic() -> String {
    String::from("driving/alerts")
}

fn default_telemetry_topic() -> String {
    String::from("driving/telemetry")
}

fn default_status_topic() -> String {
    String::from("driving/status")
}

fn default_commands_topic() -> String {
    String::from("driving/commands")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./driving_monitor.db")
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

fn default_true() -> bool {
    true
}

fn default_thresholds() -> Thresholds {
    Thresholds {
        crash: Some(3.0),
        braking: Some(2.0),
        accel: Some(1.5),
        cornering: Some(2.0),
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Load the config from `path`, then `$DRIVE_MONITOR_CONFIG`, else use defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => read_config_file(path),
        None => match std::env::var(CONFIG_ENV) {
            Ok(path) => read_config_file(path),
            Err(_) => Ok(Config::default()),
        },
    }
}
