// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-observability
//!
//! Logging setup shared by every tracklink binary. Library crates only emit
//! `tracing` events; installing the subscriber is the binary's job.
//!
//! ## Features
//! - `file-logging`: timestamped run folders with daily-rolling log files

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known tracklink crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "tracklink-config",
    "tracklink-transports",
    "tracklink-protocol",
    "tracklink-shm",
    "tracklink-bus",
    "tracklink-runtime",
];
