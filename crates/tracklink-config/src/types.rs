// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to one section of `tracklink.toml`. Every section is
//! `#[serde(default)]` so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TracklinkConfig {
    pub bus: BusConfig,
    pub handshake: HandshakeConfig,
    pub frames: FramesConfig,
    pub heartbeat: HeartbeatConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
    /// Per-component configuration documents served during registration,
    /// keyed by component id. Opaque to everything but the component itself.
    pub components: BTreeMap<String, serde_json::Value>,
}

/// Bus endpoints: one shared ingress, one fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// Host components connect to
    pub host: String,
    /// Interface the broker binds on
    pub bind_host: String,
    pub ingress_port: u16,
    pub fanout_port: u16,
    pub send_hwm: usize,
    pub recv_hwm: usize,
    /// Largest accepted payload in bytes
    pub max_message_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            bind_host: "127.0.0.1".to_string(),
            ingress_port: 6667,
            fanout_port: 6668,
            send_hwm: 1000,
            recv_hwm: 1000,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

impl BusConfig {
    /// Endpoint publishers connect their PUSH socket to
    pub fn ingress_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.ingress_port)
    }

    /// Endpoint subscribers connect their SUB socket to
    pub fn fanout_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.fanout_port)
    }

    pub fn ingress_bind_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.bind_host, self.ingress_port)
    }

    pub fn fanout_bind_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.bind_host, self.fanout_port)
    }
}

/// Registration handshake policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Logical id of the peer that answers registrations
    pub core_id: String,
    /// Bound on waiting for the configuration reply
    pub timeout_ms: u64,
    /// Pause between subscribing to the reply topic and sending the request
    pub settle_ms: u64,
    /// Extra attempts after a HandshakeTimeout (0 = fail on the first timeout)
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            core_id: "TrackerCore".to_string(),
            timeout_ms: 10_000,
            settle_ms: 100,
            retries: 0,
            retry_backoff_ms: 1000,
        }
    }
}

impl HandshakeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Shared-memory frame buffers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FramesConfig {
    /// How many recent buffers the producer keeps alive
    pub history_capacity: usize,
    pub bytes_per_pixel: usize,
    /// Directory backing the regions (defaults to /dev/shm when available)
    pub shm_dir: Option<PathBuf>,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            history_capacity: 2,
            bytes_per_pixel: 4,
            shm_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Silence after which a supervisor treats the component as dead
    pub timeout_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
            timeout_ms: 5000,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Steady-state poll bound; the loop returns to check for cancellation this often
    pub poll_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Optional directory for rolling log files
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            directory: None,
        }
    }
}

/// `host:port` pair naming a component's own request/response endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentAddress {
    pub host: String,
    pub port: u16,
}

impl ComponentAddress {
    pub fn tcp_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for ComponentAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| {
            ConfigError::InvalidValue(format!("component address '{}' is not host:port", s))
        })?;
        if host.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "component address '{}' has an empty host",
                s
            )));
        }
        let port = port.parse::<u16>().map_err(|e| {
            ConfigError::InvalidValue(format!("component address '{}' has a bad port: {}", s, e))
        })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl TryFrom<String> for ComponentAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentAddress> for String {
    fn from(value: ComponentAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_address_parse() {
        let addr: ComponentAddress = "localhost:50051".parse().unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 50051);
        assert_eq!(addr.to_string(), "localhost:50051");
        assert_eq!(addr.tcp_endpoint(), "tcp://localhost:50051");
    }

    #[test]
    fn test_component_address_rejects_garbage() {
        assert!("localhost".parse::<ComponentAddress>().is_err());
        assert!(":80".parse::<ComponentAddress>().is_err());
        assert!("host:notaport".parse::<ComponentAddress>().is_err());
        assert!("host:70000".parse::<ComponentAddress>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TracklinkConfig = toml::from_str("[bus]\ningress_port = 7000\n").unwrap();
        assert_eq!(config.bus.ingress_port, 7000);
        assert_eq!(config.bus.fanout_port, 6668);
        assert_eq!(config.handshake.timeout_ms, 10_000);
        assert_eq!(config.frames.history_capacity, 2);
    }

    #[test]
    fn test_components_table_is_opaque_json() {
        let config: TracklinkConfig = toml::from_str(
            r#"
            [components.SleapTracker]
            model_path = "/models/centered"
            anchor_node = "head"
            max_instances = 3
            "#,
        )
        .unwrap();

        let doc = &config.components["SleapTracker"];
        assert_eq!(doc["anchor_node"], "head");
        assert_eq!(doc["max_instances"], 3);
    }

    #[test]
    fn test_log_format_lowercase() {
        let config: TracklinkConfig = toml::from_str("[logging]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
