// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! All problems are collected before reporting so an operator fixes the file
//! in one pass.

use crate::{ConfigError, ConfigResult, TracklinkConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPortRange { port_name: String, port: u16 },
    PortConflict { port1: String, port2: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPortRange { port_name, port } => {
                write!(
                    f,
                    "Port {} = {} is outside valid range (1024-65535)",
                    port_name, port
                )
            }
            Self::PortConflict { port1, port2, port } => {
                write!(
                    f,
                    "Port conflict: {} and {} both use port {}",
                    port1, port2, port
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &TracklinkConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_ports(config, &mut errors);
    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_ports(config: &TracklinkConfig, errors: &mut Vec<ConfigValidationError>) {
    let ports = [
        ("bus.ingress_port", config.bus.ingress_port),
        ("bus.fanout_port", config.bus.fanout_port),
    ];

    for (name, port) in ports {
        if port < 1024 {
            errors.push(ConfigValidationError::InvalidPortRange {
                port_name: name.to_string(),
                port,
            });
        }
    }

    if config.bus.ingress_port == config.bus.fanout_port {
        errors.push(ConfigValidationError::PortConflict {
            port1: "bus.ingress_port".to_string(),
            port2: "bus.fanout_port".to_string(),
            port: config.bus.ingress_port,
        });
    }
}

fn validate_required_fields(config: &TracklinkConfig, errors: &mut Vec<ConfigValidationError>) {
    let required = [
        ("bus.host", config.bus.host.as_str()),
        ("bus.bind_host", config.bus.bind_host.as_str()),
        ("handshake.core_id", config.handshake.core_id.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        }
    }

    // The core id becomes a topic suffix
    if config.handshake.core_id.contains('.') {
        errors.push(ConfigValidationError::InvalidValue {
            field: "handshake.core_id".to_string(),
            reason: "must not contain '.'".to_string(),
        });
    }
}

fn validate_value_ranges(config: &TracklinkConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.handshake.timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "handshake.timeout_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.frames.history_capacity == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "frames.history_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if !(1..=8).contains(&config.frames.bytes_per_pixel) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "frames.bytes_per_pixel".to_string(),
            reason: "must be between 1 and 8".to_string(),
        });
    }

    if config.bus.max_message_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "bus.max_message_size".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.heartbeat.enabled {
        if config.heartbeat.interval_ms == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: "heartbeat.interval_ms".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if config.heartbeat.timeout_ms <= config.heartbeat.interval_ms {
            errors.push(ConfigValidationError::InvalidValue {
                field: "heartbeat.timeout_ms".to_string(),
                reason: "must be greater than heartbeat.interval_ms".to_string(),
            });
        }
    }

    if config.runtime.poll_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "runtime.poll_timeout_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: "must be one of trace, debug, info, warn, error".to_string(),
        });
    }
}
