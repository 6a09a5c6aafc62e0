// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink - multi-process organism tracking bus
//!
//! Independent tracking components (detectors, matchers, recorders, bridges)
//! exchange data over two channels:
//!
//! - a topic-routed publish/subscribe bus carrying typed JSON envelopes, and
//! - shared-memory frame buffers, referenced on the bus by id so multi-megapixel
//!   frames are never copied through it.
//!
//! ## Feature Flags
//!
//! - **`full`** (default): everything below
//! - **`shm`**: frame buffer pool and read-only mapping
//! - **`bus`**: broker, client, registration handshake, liveness
//! - **`runtime`**: the component run loop (implies `bus` and `shm`)
//! - **`observability`**: logging setup for binaries
//! - **`file-logging`**: rolling log files for the operator tools
//!
//! The wire protocol and configuration loader are always available.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Runtime: tracklink-runtime                             │
//! │  (register → configure → subscribe → poll/dispatch)     │
//! └─────────────────────────────────────────────────────────┘
//!               ↓                              ↓
//! ┌────────────────────────────┐  ┌─────────────────────────┐
//! │  Bus: tracklink-bus        │  │  Frames: tracklink-shm  │
//! │  (broker, client, desk)    │  │  (pool, read-only maps) │
//! └────────────────────────────┘  └─────────────────────────┘
//!               ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Wire: tracklink-protocol, tracklink-transports         │
//! │  (tagged JSON envelopes over ZMQ PUSH/PULL + PUB/SUB)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Writing a component
//!
//! ```rust,no_run
//! use tracklink::prelude::*;
//!
//! struct Printer;
//!
//! impl Component for Printer {
//!     fn descriptor(&self) -> ComponentDescriptor {
//!         ComponentDescriptor::new("Printer", ComponentKind::Observer)
//!     }
//!
//!     fn configure(&mut self, _config: &ComponentConfig) -> RuntimeResult<()> {
//!         Ok(())
//!     }
//!
//!     fn subscriptions(&self) -> Vec<String> {
//!         vec![Topic::Entities.as_str_name().to_string()]
//!     }
//!
//!     fn on_entities(&mut self, _ctx: &ComponentContext<'_>, set: &EntitySet) -> RuntimeResult<()> {
//!         println!("{} tracks at {}", set.entities.len(), set.timestamp);
//!         Ok(())
//!     }
//! }
//!
//! let config = tracklink::config::load_config_or_default(None)?;
//! let summary = ComponentRuntime::connect(Printer, &config)?.run()?;
//! println!("{:?}", summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use tracklink_config as config;
pub use tracklink_protocol as protocol;

#[cfg(feature = "bus")]
pub use tracklink_transports as transports;

#[cfg(feature = "shm")]
pub use tracklink_shm as shm;

#[cfg(feature = "bus")]
pub use tracklink_bus as bus;

#[cfg(feature = "runtime")]
pub use tracklink_runtime as runtime;

#[cfg(feature = "observability")]
pub use tracklink_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config_or_default, TracklinkConfig};
    pub use crate::protocol::{
        decode, encode, ComponentDescriptor, ComponentKind, EntitySet, Envelope, FeatureSet,
        FrameAvailable, Payload, PlaybackState, Timestamp, Topic,
    };

    #[cfg(feature = "shm")]
    pub use crate::shm::{FrameBuffer, FrameBufferPool, FrameStore, PoolConfig, ShmError};

    #[cfg(feature = "bus")]
    pub use crate::bus::{
        Broker, BrokerConfig, BusClient, BusClientConfig, BusError, RegistrationDesk,
    };

    #[cfg(feature = "runtime")]
    pub use crate::runtime::{
        Component, ComponentConfig, ComponentContext, ComponentRuntime, RunSummary,
        RuntimeError, RuntimeResult, ShutdownHandle,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let payload = Payload::Shutdown;
        assert_eq!(payload.topic(), Topic::Shutdown.as_str_name());
        assert_eq!(TracklinkConfig::default().frames.history_capacity, 2);
    }
}
