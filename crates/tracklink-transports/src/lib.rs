// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-transports
//!
//! Socket-level transports underneath the tracklink message bus.
//!
//! The bus needs exactly two socket pairs:
//!
//! - **Ingress**: every local publisher connects a PUSH socket to one shared
//!   PULL socket owned by the broker.
//! - **Fan-out**: the broker binds a PUB socket; every component connects a
//!   SUB socket and filters by topic prefix.
//!
//! Every message on either pair is two frames: `[topic, payload]`. The topic
//! frame is routing-only; this crate never looks inside the payload.
//!
//! ## Feature Flags
//!
//! - `zmq-server`: bound sockets (PUB, PULL)
//! - `zmq-client`: connected sockets (SUB, PUSH)
//! - `zmq`: both
//!
//! ## Example: Publish-Subscribe
//!
//! ```no_run
//! use tracklink_transports::zmq::server::ZmqPub;
//! use tracklink_transports::zmq::client::ZmqSub;
//! use tracklink_transports::traits::{Publisher, Subscriber, Transport};
//!
//! let mut publisher = ZmqPub::with_address("tcp://127.0.0.1:6668")?;
//! publisher.start()?;
//!
//! let mut subscriber = ZmqSub::with_address("tcp://127.0.0.1:6668")?;
//! subscriber.start()?;
//! subscriber.subscribe(b"IMAGE.")?;
//!
//! publisher.publish(b"IMAGE.Tracking", b"{}")?;
//! if let Some(frame) = subscriber.receive_timeout(1000)? {
//!     println!("{} -> {} bytes", frame.topic_str(), frame.data.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Timeouts
//!
//! Receive timeouts are milliseconds as `i64` with the libzmq convention:
//! negative blocks indefinitely, `0` returns immediately. A timeout is
//! `Ok(None)`, never an error.

pub mod common;
pub mod traits;

#[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
pub mod zmq;

pub use common::{
    ClientConfig, ServerConfig, SocketStats, TopicFrame, TransportConfig, TransportError,
    TransportResult,
};

pub use traits::{Publisher, Pull, Push, Subscriber, Transport, TransportStats};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::traits::*;

    #[cfg(feature = "zmq-server")]
    pub use crate::zmq::server::*;

    #[cfg(feature = "zmq-client")]
    pub use crate::zmq::client::*;
}
