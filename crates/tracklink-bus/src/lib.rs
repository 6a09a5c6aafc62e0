// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-bus
//!
//! Topic-routed publish/subscribe between tracklink components.
//!
//! ```text
//!  publishers ──PUSH──▶ [ingress] Broker [fan-out] ──PUB──▶ SUB subscribers
//! ```
//!
//! - [`Broker`]: one per host; forwards `[topic, payload]` frames from the
//!   shared ingress to every subscriber whose prefix matches. Best-effort,
//!   at-most-once, ordered only per topic per publisher.
//! - [`BusClient`]: one per component; publish, subscribe, poll, and the
//!   blocking [`register`](BusClient::register) handshake.
//! - [`RegistrationDesk`]: the core's answering side of the handshake.
//! - [`HeartbeatService`] / [`LivenessMonitor`]: the liveness signal and its
//!   supervisor-side bookkeeping.
//!
//! `poll` is the only call that waits on the network; everything else returns
//! immediately.

pub mod broker;
pub mod client;
pub mod desk;
pub mod error;
pub mod heartbeat;
pub mod liveness;
pub mod reconnect;

pub use broker::{Broker, BrokerConfig, BrokerHandle, BrokerStats};
pub use client::{BusClient, BusClientConfig};
pub use desk::RegistrationDesk;
pub use error::{BusError, BusResult};
pub use heartbeat::HeartbeatService;
pub use liveness::LivenessMonitor;
pub use reconnect::{retry_with_backoff, ReconnectionStrategy};
