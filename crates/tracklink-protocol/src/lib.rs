// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # tracklink-protocol
//!
//! Wire format for everything that travels over the tracklink bus.
//!
//! A message is an [`Envelope`]: a routing-only topic string plus a
//! [`Payload`]. Payloads are JSON objects carrying a literal `"type"`
//! discriminator. Decoding reads the discriminator first and fails closed on
//! anything it does not recognize; unknown *extra* fields are ignored so older
//! consumers keep working against newer producers.
//!
//! Numeric quantities that may be uncomputable (coordinates, confidences,
//! scores) are `Option<f64>`. A non-finite value is written as `null` and
//! read back as `None`, in both directions.
//!
//! ```rust
//! use tracklink_protocol::{decode, encode, FrameAvailable, Payload, Timestamp};
//!
//! let payload = Payload::Image(FrameAvailable {
//!     stream_id: "Tracking".into(),
//!     timestamp: Timestamp::from_millis(40),
//!     buffer_id: "buf-7".into(),
//!     width: 64,
//!     height: 48,
//! });
//! assert_eq!(payload.topic(), "IMAGE.Tracking");
//!
//! let bytes = encode(&payload)?;
//! assert_eq!(decode(&bytes)?, payload);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod absent;
pub mod codec;
pub mod error;
pub mod payload;
pub mod timestamp;
pub mod topic;

pub use codec::{decode, encode, Envelope, DISCRIMINATOR};
pub use error::{DecodeError, EncodeError};
pub use payload::{
    ComponentDescriptor, ComponentKind, Edge, EntitySet, Feature, FeatureSet, FrameAvailable,
    KeyPoint, Payload, PayloadKind, PlaybackState, SeekRange, SkeletonDescriptor,
};
pub use timestamp::Timestamp;
pub use topic::{topic_matches, Topic, TOPIC_SEPARATOR};
