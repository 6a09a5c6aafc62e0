// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Subscriber installation for tracklink binaries

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// What a binary wants from its logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Default level for everything not named by a debug flag
    pub level: String,
    /// Emit JSON lines on the console instead of human-readable text
    pub json: bool,
    /// Base directory for log files (`file-logging` feature only)
    pub directory: Option<PathBuf>,
    /// How many run folders to keep under `directory`
    pub retention_runs: usize,
    #[serde(skip)]
    pub debug_flags: CrateDebugFlags,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
            retention_runs: 10,
            debug_flags: CrateDebugFlags::default(),
        }
    }
}

impl LoggingOptions {
    /// Filter directives: `RUST_LOG` wins when set, otherwise debug flags plus the default level
    pub fn filter(&self) -> EnvFilter {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(self.debug_flags.to_filter_string(&self.level)),
        }
    }
}

/// Keeps background log writers alive; dropping it flushes them
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder holding this process's log files, if file logging is on
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the log directory
/// cannot be created.
pub fn init_logging(options: &LoggingOptions) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(options.filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(options.filter())
            .boxed()
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();
    let mut log_dir = None;

    if let Some(base) = &options.directory {
        let run_folder = create_run_folder(base)?;
        cleanup_old_runs(base, options.retention_runs)?;

        #[cfg(feature = "file-logging")]
        {
            let appender = tracing_appender::rolling::daily(&run_folder, "tracklink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guards.push(guard);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .with_filter(options.filter())
                    .boxed(),
            );
        }

        log_dir = Some(run_folder);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

/// Console-only logging at the given level
pub fn init_logging_default(level: &str) -> Result<LoggingGuard> {
    init_logging(&LoggingOptions {
        level: level.to_string(),
        debug_flags: crate::cli::parse_debug_flags(),
        ..Default::default()
    })
}

fn create_run_folder(base: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base.join(format!("run_{}_{}", timestamp, std::process::id()));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Keep only the newest `keep` run folders under `base`
fn cleanup_old_runs(base: &Path, keep: usize) -> Result<()> {
    let mut runs: Vec<PathBuf> = std::fs::read_dir(base)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("run_"))
        })
        .collect();

    if runs.len() <= keep {
        return Ok(());
    }

    // Folder names sort chronologically
    runs.sort();
    let excess = runs.len() - keep;
    for path in runs.into_iter().take(excess) {
        if let Err(e) = std::fs::remove_dir_all(&path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_runs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["run_20250101_000000_1", "run_20250102_000000_1", "run_20250103_000000_1"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("unrelated")).unwrap();

        cleanup_old_runs(dir.path(), 2).unwrap();

        assert!(!dir.path().join("run_20250101_000000_1").exists());
        assert!(dir.path().join("run_20250102_000000_1").exists());
        assert!(dir.path().join("run_20250103_000000_1").exists());
        assert!(dir.path().join("unrelated").exists());
    }

    #[test]
    fn test_run_folder_created() {
        let dir = tempfile::tempdir().unwrap();
        let run = create_run_folder(dir.path()).unwrap();
        assert!(run.is_dir());
        assert!(run.file_name().unwrap().to_str().unwrap().starts_with("run_"));
    }
}
