// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common types and utilities for all transports

pub mod config;
pub mod error;
pub mod message;

pub use config::{ClientConfig, ServerConfig, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use message::{SocketStats, TopicFrame};
