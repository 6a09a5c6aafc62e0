// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Message framing and per-socket counters

use std::sync::atomic::{AtomicU64, Ordering};

/// One routed message: a topic frame followed by a payload frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFrame {
    pub topic: Vec<u8>,
    pub data: Vec<u8>,
}

impl TopicFrame {
    pub fn new(topic: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
        }
    }

    /// Build from raw multipart frames; exactly two are required
    pub fn from_parts(mut parts: Vec<Vec<u8>>) -> crate::TransportResult<Self> {
        if parts.len() != 2 {
            return Err(crate::TransportError::InvalidMessage(format!(
                "expected 2 frames [topic, payload], got {}",
                parts.len()
            )));
        }
        let data = parts.pop().unwrap_or_default();
        let topic = parts.pop().unwrap_or_default();
        Ok(Self { topic, data })
    }

    /// Topic as text (lossy for non UTF-8 topics)
    pub fn topic_str(&self) -> String {
        String::from_utf8_lossy(&self.topic).into_owned()
    }

    pub fn len(&self) -> usize {
        self.topic.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_empty() && self.data.is_empty()
    }
}

/// Lock-free counters shared between a socket wrapper and its observers
#[derive(Debug, Default)]
pub struct SocketStats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    errors: AtomicU64,
}

impl SocketStats {
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

impl crate::traits::TransportStats for SocketStats {
    fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TransportStats;

    #[test]
    fn test_from_parts_requires_two_frames() {
        assert!(TopicFrame::from_parts(vec![b"only".to_vec()]).is_err());
        assert!(TopicFrame::from_parts(vec![vec![], vec![], vec![]]).is_err());

        let frame = TopicFrame::from_parts(vec![b"IMAGE.a".to_vec(), b"{}".to_vec()]).unwrap();
        assert_eq!(frame.topic_str(), "IMAGE.a");
        assert_eq!(frame.data, b"{}");
        assert_eq!(frame.len(), 9);
    }

    #[test]
    fn test_stats_accumulate() {
        let stats = SocketStats::default();
        stats.record_sent(10);
        stats.record_sent(5);
        stats.record_received(7);
        stats.record_error();

        assert_eq!(stats.messages_sent(), 2);
        assert_eq!(stats.bytes_sent(), 15);
        assert_eq!(stats.messages_received(), 1);
        assert_eq!(stats.bytes_received(), 7);
        assert_eq!(stats.error_count(), 1);
    }
}
