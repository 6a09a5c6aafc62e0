// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topic naming
//!
//! Topics are hierarchical strings, `"<BASE>"` or `"<BASE>.<scope>"`.
//! Subscriptions are byte prefixes: a subscriber to `"IMAGE."` gets every
//! stream, a subscriber to `"IMAGE.Tracking"` gets only that one.

use std::fmt;

pub const TOPIC_SEPARATOR: char = '.';

/// Base topics, one per family of payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Image,
    Features,
    Entities,
    Seekable,
    Shutdown,
    ComponentMessage,
    Command,
    Event,
    Heartbeat,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Self::Image,
        Self::Features,
        Self::Entities,
        Self::Seekable,
        Self::Shutdown,
        Self::ComponentMessage,
        Self::Command,
        Self::Event,
        Self::Heartbeat,
    ];

    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Features => "FEATURES",
            Self::Entities => "ENTITIES",
            Self::Seekable => "SEEKABLE",
            Self::Shutdown => "SHUTDOWN",
            Self::ComponentMessage => "COMPONENT_MESSAGE",
            Self::Command => "COMMAND",
            Self::Event => "EVENT",
            Self::Heartbeat => "HEARTBEAT",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str_name() == value)
    }

    /// `"<BASE>.<scope>"`
    pub fn scoped(&self, scope: &str) -> String {
        format!("{}{}{}", self.as_str_name(), TOPIC_SEPARATOR, scope)
    }

    /// Base topic of a full topic string, if it is one of ours
    pub fn base_of(topic: &str) -> Option<Self> {
        let base = topic.split(TOPIC_SEPARATOR).next().unwrap_or(topic);
        Self::from_str_name(base)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_name())
    }
}

/// Exact-or-prefix match, the rule the fan-out applies to subscriptions
pub fn topic_matches(prefix: &str, topic: &str) -> bool {
    topic.as_bytes().starts_with(prefix.as_bytes())
}
