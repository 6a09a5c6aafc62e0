// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later wins:
//! 1. TOML file (or built-in defaults when no file exists)
//! 2. Environment variables
//! 3. CLI arguments

use crate::{ConfigError, ConfigResult, TracklinkConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "tracklink.toml";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "TRACKLINK_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `TRACKLINK_CONFIG_PATH` environment variable
/// 2. Current working directory: `./tracklink.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is missing or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<TracklinkConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: TracklinkConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Like [`load_config`], but a missing file yields built-in defaults
/// (still subject to environment and CLI overrides).
///
/// An explicit path that does not exist is still an error.
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<TracklinkConfig> {
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) if env::var(CONFIG_PATH_ENV).is_err() => {
            let mut config = TracklinkConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli)?;
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse::<T>().ok())
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `TRACKLINK_BUS_HOST` -> `bus.host`
/// - `TRACKLINK_BUS_BIND_HOST` -> `bus.bind_host`
/// - `TRACKLINK_INGRESS_PORT` -> `bus.ingress_port`
/// - `TRACKLINK_FANOUT_PORT` -> `bus.fanout_port`
/// - `TRACKLINK_CORE_ID` -> `handshake.core_id`
/// - `TRACKLINK_HANDSHAKE_TIMEOUT_MS` -> `handshake.timeout_ms`
/// - `TRACKLINK_HANDSHAKE_RETRIES` -> `handshake.retries`
/// - `TRACKLINK_FRAME_HISTORY` -> `frames.history_capacity`
/// - `TRACKLINK_BYTES_PER_PIXEL` -> `frames.bytes_per_pixel`
/// - `TRACKLINK_SHM_DIR` -> `frames.shm_dir`
/// - `TRACKLINK_LOG_LEVEL` -> `logging.level`
///
/// Unparseable numeric values are ignored and the previous value kept.
pub fn apply_environment_overrides(config: &mut TracklinkConfig) {
    if let Ok(value) = env::var("TRACKLINK_BUS_HOST") {
        config.bus.host = value;
    }
    if let Ok(value) = env::var("TRACKLINK_BUS_BIND_HOST") {
        config.bus.bind_host = value;
    }
    if let Some(port) = env_parse("TRACKLINK_INGRESS_PORT") {
        config.bus.ingress_port = port;
    }
    if let Some(port) = env_parse("TRACKLINK_FANOUT_PORT") {
        config.bus.fanout_port = port;
    }

    if let Ok(value) = env::var("TRACKLINK_CORE_ID") {
        config.handshake.core_id = value;
    }
    if let Some(ms) = env_parse("TRACKLINK_HANDSHAKE_TIMEOUT_MS") {
        config.handshake.timeout_ms = ms;
    }
    if let Some(retries) = env_parse("TRACKLINK_HANDSHAKE_RETRIES") {
        config.handshake.retries = retries;
    }

    if let Some(capacity) = env_parse("TRACKLINK_FRAME_HISTORY") {
        config.frames.history_capacity = capacity;
    }
    if let Some(bpp) = env_parse("TRACKLINK_BYTES_PER_PIXEL") {
        config.frames.bytes_per_pixel = bpp;
    }
    if let Ok(value) = env::var("TRACKLINK_SHM_DIR") {
        config.frames.shm_dir = Some(PathBuf::from(value));
    }

    if let Ok(value) = env::var("TRACKLINK_LOG_LEVEL") {
        config.logging.level = value;
    }
}

fn cli_parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(format!("--{}={}: {}", key, value, e)))
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `bus_host`, `bind_host`, `ingress_port`, `fanout_port`, `core_id`,
/// `handshake_timeout_ms`, `frame_history`, `bytes_per_pixel`, `shm_dir`, `log_level`.
///
/// Unlike environment overrides, a malformed CLI value is an error: the
/// operator typed it on purpose.
pub fn apply_cli_overrides(
    config: &mut TracklinkConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("bus_host") {
        config.bus.host = value.clone();
    }
    if let Some(value) = cli_args.get("bind_host") {
        config.bus.bind_host = value.clone();
    }
    if let Some(value) = cli_args.get("ingress_port") {
        config.bus.ingress_port = cli_parse("ingress_port", value)?;
    }
    if let Some(value) = cli_args.get("fanout_port") {
        config.bus.fanout_port = cli_parse("fanout_port", value)?;
    }
    if let Some(value) = cli_args.get("core_id") {
        config.handshake.core_id = value.clone();
    }
    if let Some(value) = cli_args.get("handshake_timeout_ms") {
        config.handshake.timeout_ms = cli_parse("handshake_timeout_ms", value)?;
    }
    if let Some(value) = cli_args.get("frame_history") {
        config.frames.history_capacity = cli_parse("frame_history", value)?;
    }
    if let Some(value) = cli_args.get("bytes_per_pixel") {
        config.frames.bytes_per_pixel = cli_parse("bytes_per_pixel", value)?;
    }
    if let Some(value) = cli_args.get("shm_dir") {
        config.frames.shm_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    Ok(())
}
