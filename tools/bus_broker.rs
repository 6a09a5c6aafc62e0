// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! tracklink-broker - the bus broker, optionally serving component registrations
//!
//! ```text
//! tracklink-broker --components components.toml
//! ```
//!
//! `components.toml` holds one table per component id; each table is sent
//! verbatim (as JSON) in reply to that component's registration:
//!
//! ```toml
//! [components.Sleap]
//! model = "/models/fly.h5"
//! anchor = "thorax"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use tracklink::bus::{
    Broker, BrokerConfig, BusClient, BusClientConfig, BusError, LivenessMonitor, RegistrationDesk,
};
use tracklink::config::{load_config, load_config_or_default, validate_config, LogFormat, TracklinkConfig};
use tracklink::observability::{init_logging, CrateDebugFlags, LoggingOptions, DEBUG_ENV};
use tracklink::protocol::Topic;

const SERVE_POLL_MS: i64 = 200;

/// Tracklink bus broker
#[derive(Parser, Debug)]
#[command(name = "tracklink-broker", version, author, long_about = None)]
struct Args {
    /// Configuration file (default: TRACKLINK_CONFIG_PATH or ./tracklink.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Answer registrations from this file's [components.<id>] tables
    #[arg(long)]
    components: Option<PathBuf>,

    /// Answer registrations from unknown components with an empty configuration
    #[arg(long, default_value_t = false)]
    accept_unknown: bool,

    /// Host to bind both endpoints on
    #[arg(long)]
    bind_host: Option<String>,

    #[arg(long)]
    ingress_port: Option<u16>,

    #[arg(long)]
    fanout_port: Option<u16>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Crates to log at debug level, comma-separated, or `all`
    #[arg(long, value_delimiter = ',')]
    debug: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentsFile {
    #[serde(default)]
    components: BTreeMap<String, serde_json::Value>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load(&args)?;
    let _log_guard = init_logging(&logging_options(&config, args.json_logs, &args.debug))?;

    let mut configs = config.components.clone();
    if let Some(path) = &args.components {
        configs.extend(read_components(path)?);
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut broker = Broker::new(BrokerConfig::from_bus_config(&config.bus))
        .start()
        .context("failed to start broker")?;

    let serve_registrations = args.accept_unknown || !configs.is_empty();
    if serve_registrations {
        serve(&config, configs, args.accept_unknown, &running)?;
    } else {
        info!("No component configurations; registrations will not be answered");
        while running.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(SERVE_POLL_MS as u64));
        }
    }

    broker.stop();
    let stats = broker.stats();
    info!(
        "✅ Broker shutdown complete ({} received, {} forwarded, {} errors)",
        stats.received, stats.forwarded, stats.errors
    );
    Ok(())
}

fn load(args: &Args) -> Result<TracklinkConfig> {
    let mut cli = HashMap::new();
    if let Some(host) = &args.bind_host {
        cli.insert("bind_host".to_string(), host.clone());
    }
    if let Some(port) = args.ingress_port {
        cli.insert("ingress_port".to_string(), port.to_string());
    }
    if let Some(port) = args.fanout_port {
        cli.insert("fanout_port".to_string(), port.to_string());
    }
    if let Some(level) = &args.log_level {
        cli.insert("log_level".to_string(), level.clone());
    }

    let config = match &args.config {
        Some(path) => load_config(Some(path), Some(&cli)),
        None => load_config_or_default(Some(&cli)),
    }
    .context("failed to load configuration")?;
    validate_config(&config)?;
    Ok(config)
}

fn logging_options(config: &TracklinkConfig, json: bool, debug: &[String]) -> LoggingOptions {
    let mut debug_flags = CrateDebugFlags::default();
    debug_flags.merge_env_value(&debug.join(","));
    if let Ok(value) = std::env::var(DEBUG_ENV) {
        debug_flags.merge_env_value(&value);
    }

    LoggingOptions {
        level: config.logging.level.clone(),
        json: json || config.logging.format == LogFormat::Json,
        directory: config.logging.directory.clone(),
        debug_flags,
        ..LoggingOptions::default()
    }
}

fn read_components(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: ComponentsFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        "Loaded {} component configurations from {}",
        file.components.len(),
        path.display()
    );
    Ok(file.components)
}

/// Answer registrations and watch heartbeats until interrupted
fn serve(
    config: &TracklinkConfig,
    configs: BTreeMap<String, serde_json::Value>,
    accept_unknown: bool,
    running: &AtomicBool,
) -> Result<()> {
    let client = BusClient::connect(BusClientConfig::from_config(config))?;
    let mut desk = RegistrationDesk::new(client, config.handshake.core_id.clone())?.with_configs(configs);
    if accept_unknown {
        desk = desk.with_fallback(serde_json::json!({}));
    }

    let mut monitor = config
        .heartbeat
        .enabled
        .then(|| LivenessMonitor::new(config.heartbeat.timeout()));
    if monitor.is_some() {
        desk.client_mut().subscribe_topic(Topic::Heartbeat)?;
    }

    info!("🚀 Serving registrations as '{}' (Press Ctrl+C to stop)", desk.core_id());
    while running.load(Ordering::Relaxed) {
        match desk.serve_once(SERVE_POLL_MS) {
            Ok(Some(envelope)) => {
                if let Some(monitor) = monitor.as_mut() {
                    monitor.observe(&envelope, Instant::now());
                }
            }
            Ok(None) => {}
            Err(BusError::Decode { topic, source }) => {
                warn!("Discarding undecodable message on '{}': {}", topic, source);
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(monitor) = monitor.as_mut() {
            for component_id in monitor.expired(Instant::now()) {
                error!("Liveness failure: '{}' stopped sending heartbeats", component_id);
                monitor.forget(&component_id);
            }
        }
    }
    Ok(())
}
