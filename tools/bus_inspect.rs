// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! tracklink-inspect - log traffic on the bus
//!
//! ```text
//! tracklink-inspect --topic IMAGE. --topic COMPONENT_MESSAGE
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use tracklink::bus::{BusClient, BusClientConfig, BusError};
use tracklink::config::{load_config, load_config_or_default, LogFormat};
use tracklink::observability::{init_logging, CrateDebugFlags, LoggingOptions, DEBUG_ENV};
use tracklink::protocol::encode;

/// Tracklink bus inspector
#[derive(Parser, Debug)]
#[command(name = "tracklink-inspect", version, author, long_about = None)]
struct Args {
    /// Configuration file (default: TRACKLINK_CONFIG_PATH or ./tracklink.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topic prefix to follow; repeatable (default: everything)
    #[arg(short, long)]
    topic: Vec<String>,

    /// Exit after this many messages (0 = run until interrupted)
    #[arg(short = 'n', long, default_value_t = 0)]
    count: u64,

    /// Print each payload in its wire form
    #[arg(long, default_value_t = false)]
    payloads: bool,

    /// Host the broker runs on
    #[arg(long)]
    bus_host: Option<String>,

    #[arg(long)]
    fanout_port: Option<u16>,

    /// Emit JSON log lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Crates to log at debug level, comma-separated, or `all`
    #[arg(long, value_delimiter = ',')]
    debug: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut cli = HashMap::new();
    if let Some(host) = &args.bus_host {
        cli.insert("bus_host".to_string(), host.clone());
    }
    if let Some(port) = args.fanout_port {
        cli.insert("fanout_port".to_string(), port.to_string());
    }
    let config = match &args.config {
        Some(path) => load_config(Some(path), Some(&cli)),
        None => load_config_or_default(Some(&cli)),
    }
    .context("failed to load configuration")?;

    let mut debug_flags = CrateDebugFlags::default();
    debug_flags.merge_env_value(&args.debug.join(","));
    if let Ok(value) = std::env::var(DEBUG_ENV) {
        debug_flags.merge_env_value(&value);
    }
    let _log_guard = init_logging(&LoggingOptions {
        level: config.logging.level.clone(),
        json: args.json_logs || config.logging.format == LogFormat::Json,
        debug_flags,
        ..LoggingOptions::default()
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut client = BusClient::connect(BusClientConfig::from_config(&config))?;
    let topics = if args.topic.is_empty() {
        vec![String::new()]
    } else {
        args.topic.clone()
    };
    for topic in &topics {
        client.subscribe(topic)?;
    }
    info!(
        "Inspecting {} on {}",
        topics
            .iter()
            .map(|t| if t.is_empty() { "<all>" } else { t.as_str() })
            .collect::<Vec<_>>()
            .join(", "),
        client.config().fanout_endpoint
    );

    let mut seen = 0u64;
    let mut discarded = 0u64;
    while running.load(Ordering::Relaxed) && (args.count == 0 || seen < args.count) {
        match client.poll(200) {
            Ok(Some(envelope)) => {
                seen += 1;
                if args.payloads {
                    info!(
                        "{} [{}] {}",
                        envelope.topic,
                        envelope.kind(),
                        String::from_utf8_lossy(&encode(&envelope.payload)?)
                    );
                } else {
                    info!("{} [{}]", envelope.topic, envelope.kind());
                }
            }
            Ok(None) => {}
            Err(BusError::Decode { topic, source }) => {
                seen += 1;
                discarded += 1;
                warn!("{} [undecodable] {}", topic, source);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Saw {} messages ({} undecodable)", seen, discarded);
    Ok(())
}
