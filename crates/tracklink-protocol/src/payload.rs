// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payload variants carried by the bus
//!
//! [`Payload`] is a closed, internally tagged enum: the JSON object's `"type"`
//! field names the variant. Adding a variant is a protocol change; adding an
//! optional field to a variant is not.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::absent::{self, finite};
use crate::timestamp::Timestamp;
use crate::topic::Topic;

/// A new frame is ready in shared memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAvailable {
    /// Camera or video stream the frame belongs to
    pub stream_id: String,
    pub timestamp: Timestamp,
    /// Shared-memory buffer id to map
    pub buffer_id: String,
    pub width: u32,
    pub height: u32,
}

/// One detected point; any coordinate or the confidence may be uncomputable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    #[serde(with = "absent")]
    pub x: Option<f64>,
    #[serde(with = "absent")]
    pub y: Option<f64>,
    #[serde(with = "absent")]
    pub confidence: Option<f64>,
}

impl KeyPoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            confidence: Some(confidence),
        }
    }

    /// True when both coordinates are known
    pub fn is_located(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }

    fn normalize(&mut self) {
        self.x = finite(self.x);
        self.y = finite(self.y);
        self.confidence = finite(self.confidence);
    }
}

/// Directed edge between two point indices of the same shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: u32,
    pub target: u32,
}

/// One detected shape (e.g. an animal's skeleton)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub points: Vec<KeyPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,
    #[serde(with = "absent")]
    pub score: Option<f64>,
    /// Stable track id once a matcher has assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

impl Feature {
    fn normalize(&mut self) {
        self.points.iter_mut().for_each(KeyPoint::normalize);
        self.score = finite(self.score);
    }
}

/// Names and topology shared by every shape of a feature set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonDescriptor {
    pub node_names: Vec<String>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Node used as the shape's anchor when one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_node: Option<String>,
}

impl SkeletonDescriptor {
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_names.iter().position(|n| n == name)
    }
}

/// Per-frame detector output, indexed by detector-local position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub timestamp: Timestamp,
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<SkeletonDescriptor>,
}

/// Per-frame tracker output, keyed by stable track id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    pub timestamp: Timestamp,
    #[serde(with = "absent::track_keys")]
    pub entities: BTreeMap<u32, Feature>,
}

/// Valid timestamp range of a seekable source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl SeekRange {
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Playback control for video sources (commands request, events confirm)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Open(String),
    Seek(Timestamp),
    Pause,
    Play,
    Stop,
}

/// Role a component plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Detector,
    Matcher,
    Recorder,
    Observer,
    Bridge,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detector => "Detector",
            Self::Matcher => "Matcher",
            Self::Recorder => "Recorder",
            Self::Observer => "Observer",
            Self::Bridge => "Bridge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub id: String,
    pub kind: ComponentKind,
}

impl ComponentDescriptor {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Everything that can travel on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Payload {
    Image(FrameAvailable),
    Features(FeatureSet),
    Entities(EntitySet),
    Seekable(SeekRange),
    Shutdown,
    /// Component asks `recipient` (the core) for its configuration
    Registration {
        recipient: String,
        component: ComponentDescriptor,
    },
    /// Configuration document addressed to one component
    Configuration {
        recipient: String,
        config: serde_json::Value,
    },
    Command {
        state: PlaybackState,
    },
    Event {
        state: PlaybackState,
    },
    Heartbeat {
        component_id: String,
        sent_at_ms: u64,
    },
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Image(_) => PayloadKind::Image,
            Self::Features(_) => PayloadKind::Features,
            Self::Entities(_) => PayloadKind::Entities,
            Self::Seekable(_) => PayloadKind::Seekable,
            Self::Shutdown => PayloadKind::Shutdown,
            Self::Registration { .. } => PayloadKind::Registration,
            Self::Configuration { .. } => PayloadKind::Configuration,
            Self::Command { .. } => PayloadKind::Command,
            Self::Event { .. } => PayloadKind::Event,
            Self::Heartbeat { .. } => PayloadKind::Heartbeat,
        }
    }

    /// Routing topic: the variant's base topic plus its scoping suffix, if any
    ///
    /// Frame notices are scoped by stream, registration traffic by recipient,
    /// heartbeats by sender.
    pub fn topic(&self) -> String {
        match self {
            Self::Image(frame) => Topic::Image.scoped(&frame.stream_id),
            Self::Registration { recipient, .. } | Self::Configuration { recipient, .. } => {
                Topic::ComponentMessage.scoped(recipient)
            }
            Self::Heartbeat { component_id, .. } => Topic::Heartbeat.scoped(component_id),
            other => other.kind().topic().as_str_name().to_string(),
        }
    }

    /// Replace every non-finite number with the absent marker, matching what
    /// a round trip through the wire would produce
    pub fn normalize(&mut self) {
        match self {
            Self::Features(set) => set.features.iter_mut().for_each(Feature::normalize),
            Self::Entities(set) => set.entities.values_mut().for_each(Feature::normalize),
            _ => {}
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

/// Discriminator values, one per [`Payload`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Image,
    Features,
    Entities,
    Seekable,
    Shutdown,
    Registration,
    Configuration,
    Command,
    Event,
    Heartbeat,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 10] = [
        Self::Image,
        Self::Features,
        Self::Entities,
        Self::Seekable,
        Self::Shutdown,
        Self::Registration,
        Self::Configuration,
        Self::Command,
        Self::Event,
        Self::Heartbeat,
    ];

    /// The literal `"type"` value on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Features => "Features",
            Self::Entities => "Entities",
            Self::Seekable => "Seekable",
            Self::Shutdown => "Shutdown",
            Self::Registration => "Registration",
            Self::Configuration => "Configuration",
            Self::Command => "Command",
            Self::Event => "Event",
            Self::Heartbeat => "Heartbeat",
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            Self::Image => Topic::Image,
            Self::Features => Topic::Features,
            Self::Entities => Topic::Entities,
            Self::Seekable => Topic::Seekable,
            Self::Shutdown => Topic::Shutdown,
            Self::Registration | Self::Configuration => Topic::ComponentMessage,
            Self::Command => Topic::Command,
            Self::Event => Topic::Event,
            Self::Heartbeat => Topic::Heartbeat,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the wire names
impl FromStr for PayloadKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde_tags() {
        let samples = [
            Payload::Shutdown,
            Payload::Command {
                state: PlaybackState::Pause,
            },
            Payload::Seekable(SeekRange {
                start: Timestamp(0),
                end: Timestamp(10),
            }),
        ];
        for payload in samples {
            let value = serde_json::to_value(&payload).unwrap();
            assert_eq!(value["type"], payload.kind().as_str());
        }
    }

    #[test]
    fn test_kind_from_str_is_exact() {
        assert_eq!("Image".parse::<PayloadKind>(), Ok(PayloadKind::Image));
        assert!("image".parse::<PayloadKind>().is_err());
        assert!("Frame".parse::<PayloadKind>().is_err());
    }

    #[test]
    fn test_topics_are_scoped() {
        let registration = Payload::Registration {
            recipient: "TrackerCore".into(),
            component: ComponentDescriptor::new("Sleap", ComponentKind::Detector),
        };
        assert_eq!(registration.topic(), "COMPONENT_MESSAGE.TrackerCore");

        let heartbeat = Payload::Heartbeat {
            component_id: "Sleap".into(),
            sent_at_ms: 1,
        };
        assert_eq!(heartbeat.topic(), "HEARTBEAT.Sleap");
        assert_eq!(Payload::Shutdown.topic(), "SHUTDOWN");
    }

    #[test]
    fn test_normalize_clears_nan() {
        let mut payload = Payload::Features(FeatureSet {
            timestamp: Timestamp(1),
            features: vec![Feature {
                points: vec![KeyPoint::new(f64::NAN, 2.0, f64::INFINITY)],
                edges: vec![],
                score: Some(f64::NAN),
                id: None,
            }],
            skeleton: None,
        });
        payload.normalize();

        let Payload::Features(set) = payload else {
            panic!("variant changed");
        };
        let point = set.features[0].points[0];
        assert_eq!(point.x, None);
        assert_eq!(point.y, Some(2.0));
        assert_eq!(point.confidence, None);
        assert_eq!(set.features[0].score, None);
        assert!(!point.is_located());
    }

    #[test]
    fn test_skeleton_node_lookup() {
        let skeleton = SkeletonDescriptor {
            node_names: vec!["head".into(), "center".into(), "tail".into()],
            edges: vec![Edge { source: 0, target: 1 }],
            center_node: Some("center".into()),
        };
        assert_eq!(skeleton.node_index("tail"), Some(2));
        assert_eq!(skeleton.node_index("fin"), None);
    }
}
