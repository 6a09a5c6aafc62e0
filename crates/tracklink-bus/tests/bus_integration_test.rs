// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Broker, client and handshake over real loopback sockets
//!
//! Each test owns a distinct pair of ports so tests can run in parallel.

use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracklink_bus::{
    Broker, BrokerConfig, BrokerHandle, BusClient, BusClientConfig, BusError, LivenessMonitor,
    RegistrationDesk,
};
use tracklink_protocol::{
    ComponentDescriptor, ComponentKind, FrameAvailable, Payload, PayloadKind, Timestamp, Topic,
};
use tracklink_transports::zmq::client::ZmqPush;
use tracklink_transports::{Push, Transport};

/// Time for SUB subscriptions to reach the broker
const SETTLE: Duration = Duration::from_millis(200);

fn endpoints(ingress: u16, fanout: u16) -> (String, String) {
    (
        format!("tcp://127.0.0.1:{}", ingress),
        format!("tcp://127.0.0.1:{}", fanout),
    )
}

fn start_broker(ingress: u16, fanout: u16) -> BrokerHandle {
    let (ingress, fanout) = endpoints(ingress, fanout);
    Broker::new(BrokerConfig::new(ingress, fanout)).start().unwrap()
}

fn client(ingress: u16, fanout: u16) -> BusClient {
    let (ingress, fanout) = endpoints(ingress, fanout);
    BusClient::connect(
        BusClientConfig::new(ingress, fanout)
            .with_handshake_timeout(Duration::from_secs(3))
            .with_handshake_settle(SETTLE),
    )
    .unwrap()
}

fn frame_notice(stream: &str, buffer_id: &str) -> Payload {
    Payload::Image(FrameAvailable {
        stream_id: stream.into(),
        timestamp: Timestamp::from_millis(40),
        buffer_id: buffer_id.into(),
        width: 64,
        height: 48,
    })
}

#[test]
fn test_stream_subscription_isolation() {
    let broker = start_broker(32100, 32101);

    let mut subscriber = client(32100, 32101);
    subscriber.subscribe_images("Tracking").unwrap();
    let publisher = client(32100, 32101);
    thread::sleep(SETTLE);

    publisher.publish(&frame_notice("Other", "buf-1")).unwrap();
    publisher.publish(&frame_notice("Tracking", "buf-2")).unwrap();
    publisher.publish(&frame_notice("Other", "buf-3")).unwrap();

    let envelope = subscriber.poll(2000).unwrap().expect("tracking frame");
    assert_eq!(envelope.topic, "IMAGE.Tracking");
    assert_eq!(envelope.payload, frame_notice("Tracking", "buf-2"));

    assert!(subscriber.poll(300).unwrap().is_none());
    assert_eq!(broker.stats().forwarded, 3);
}

#[test]
fn test_per_topic_order_preserved() {
    let _broker = start_broker(32102, 32103);

    let mut subscriber = client(32102, 32103);
    subscriber.subscribe_topic(Topic::Image).unwrap();
    let publisher = client(32102, 32103);
    thread::sleep(SETTLE);

    for i in 0..20 {
        publisher
            .publish(&frame_notice("Tracking", &format!("buf-{}", i)))
            .unwrap();
    }

    for i in 0..20 {
        let envelope = subscriber.poll(2000).unwrap().expect("frame");
        match envelope.payload {
            Payload::Image(frame) => assert_eq!(frame.buffer_id, format!("buf-{}", i)),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_no_replay_before_subscribe() {
    let _broker = start_broker(32104, 32105);

    let publisher = client(32104, 32105);
    let mut subscriber = client(32104, 32105);
    subscriber.subscribe("").unwrap();
    thread::sleep(SETTLE);

    // Published before the SHUTDOWN subscription existed anywhere
    let mut late = client(32104, 32105);
    publisher.publish(&Payload::Shutdown).unwrap();
    assert!(subscriber.poll(2000).unwrap().is_some());

    late.subscribe_topic(Topic::Shutdown).unwrap();
    assert!(late.poll(300).unwrap().is_none());
}

#[test]
fn test_undecodable_message_is_decode_error() {
    let _broker = start_broker(32106, 32107);

    let mut subscriber = client(32106, 32107);
    subscriber.subscribe("FEATURES").unwrap();
    thread::sleep(SETTLE);

    let mut raw = ZmqPush::with_address("tcp://127.0.0.1:32106").unwrap();
    raw.start().unwrap();
    raw.push(b"FEATURES", br#"{"type":"Telepathy"}"#).unwrap();

    match subscriber.poll(2000) {
        Err(BusError::Decode { topic, .. }) => assert_eq!(topic, "FEATURES"),
        other => panic!("expected decode error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_register_times_out_without_core() {
    let _broker = start_broker(32108, 32109);
    let (ingress, fanout) = endpoints(32108, 32109);
    let mut component = BusClient::connect(
        BusClientConfig::new(ingress, fanout)
            .with_handshake_timeout(Duration::from_millis(300))
            .with_handshake_settle(Duration::from_millis(10)),
    )
    .unwrap();

    let started = Instant::now();
    let err = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap_err();

    assert!(matches!(err, BusError::HandshakeTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_register_times_out_without_broker() {
    let (ingress, fanout) = endpoints(32110, 32111);
    let mut component = BusClient::connect(
        BusClientConfig::new(ingress, fanout)
            .with_handshake_timeout(Duration::from_millis(200))
            .with_handshake_settle(Duration::from_millis(10)),
    )
    .unwrap();

    let err = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap_err();
    assert!(matches!(err, BusError::HandshakeTimeout { .. }));
}

#[test]
fn test_register_receives_configuration() {
    let _broker = start_broker(32112, 32113);
    let barrier = Arc::new(Barrier::new(2));

    let core_barrier = Arc::clone(&barrier);
    let core = thread::spawn(move || {
        let mut desk = RegistrationDesk::new(client(32112, 32113), "TrackerCore")
            .unwrap()
            .with_configs([("Sleap".to_string(), json!({"anchor": "thorax"}))].into());
        core_barrier.wait();

        let deadline = Instant::now() + Duration::from_secs(3);
        while desk.registered().is_empty() && Instant::now() < deadline {
            desk.serve_once(100).unwrap();
        }
        desk.registered().clone()
    });

    barrier.wait();
    thread::sleep(SETTLE);
    let mut component = client(32112, 32113);
    let config = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap();

    assert_eq!(config, json!({"anchor": "thorax"}));
    assert!(component
        .subscriptions()
        .contains("COMPONENT_MESSAGE.Sleap"));
    assert!(core.join().unwrap().contains("Sleap"));
}

#[test]
fn test_register_skips_longer_id_with_same_prefix() {
    let _broker = start_broker(32114, 32115);
    let barrier = Arc::new(Barrier::new(2));

    let core_barrier = Arc::clone(&barrier);
    let core = thread::spawn(move || {
        let mut core = client(32114, 32115);
        core.subscribe("COMPONENT_MESSAGE.TrackerCore").unwrap();
        core_barrier.wait();

        let envelope = core.poll(3000).unwrap().expect("registration");
        assert_eq!(envelope.kind(), PayloadKind::Registration);
        core.publish(&Payload::Configuration {
            recipient: "SleapX".into(),
            config: json!({"for": "someone else"}),
        })
        .unwrap();
        core.publish(&Payload::Configuration {
            recipient: "Sleap".into(),
            config: json!({"for": "me"}),
        })
        .unwrap();
    });

    barrier.wait();
    thread::sleep(SETTLE);
    let mut component = client(32114, 32115);
    let config = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap();
    assert_eq!(config, json!({"for": "me"}));
    core.join().unwrap();
}

#[test]
fn test_register_rejects_unexpected_reply() {
    let _broker = start_broker(32116, 32117);
    let barrier = Arc::new(Barrier::new(2));

    let core_barrier = Arc::clone(&barrier);
    let core = thread::spawn(move || {
        let mut core = client(32116, 32117);
        core.subscribe("COMPONENT_MESSAGE.TrackerCore").unwrap();
        core_barrier.wait();

        core.poll(3000).unwrap().expect("registration");
        core.publish_on("COMPONENT_MESSAGE.Sleap", &Payload::Shutdown)
            .unwrap();
    });

    barrier.wait();
    thread::sleep(SETTLE);
    let mut component = client(32116, 32117);
    let err = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap_err();
    assert!(matches!(
        err,
        BusError::UnexpectedReply {
            kind: PayloadKind::Shutdown,
            ..
        }
    ));
    core.join().unwrap();
}

#[test]
fn test_register_retries_when_enabled() {
    let _broker = start_broker(32118, 32119);

    // Core comes up only after the first attempt has already timed out
    let core = thread::spawn(|| {
        thread::sleep(Duration::from_millis(200));
        let mut desk = RegistrationDesk::new(client(32118, 32119), "TrackerCore")
            .unwrap()
            .with_fallback(json!({"retried": true}));
        let deadline = Instant::now() + Duration::from_secs(5);
        while desk.registered().is_empty() && Instant::now() < deadline {
            desk.serve_once(100).unwrap();
        }
    });

    let (ingress, fanout) = endpoints(32118, 32119);
    let mut component = BusClient::connect(
        BusClientConfig::new(ingress, fanout)
            .with_handshake_timeout(Duration::from_millis(500))
            .with_handshake_settle(Duration::from_millis(10))
            .with_handshake_retries(2, Duration::from_millis(50)),
    )
    .unwrap();

    let config = component
        .register(&ComponentDescriptor::new("Sleap", ComponentKind::Detector))
        .unwrap();
    assert_eq!(config, json!({"retried": true}));
    core.join().unwrap();
}

#[test]
fn test_heartbeats_reach_monitor() {
    let _broker = start_broker(32120, 32121);

    let mut supervisor = client(32120, 32121);
    supervisor.subscribe_topic(Topic::Heartbeat).unwrap();
    thread::sleep(SETTLE);

    let component = client(32120, 32121);
    let mut heartbeat = component
        .start_heartbeat("Sleap", Duration::from_millis(50))
        .unwrap();

    let mut monitor = LivenessMonitor::new(Duration::from_millis(500));
    let deadline = Instant::now() + Duration::from_secs(3);
    while monitor.tracked() == 0 && Instant::now() < deadline {
        if let Some(envelope) = supervisor.poll(100).unwrap() {
            assert_eq!(envelope.topic, "HEARTBEAT.Sleap");
            monitor.observe(&envelope, Instant::now());
        }
    }
    heartbeat.stop();

    assert!(monitor.is_alive("Sleap", Instant::now()));
    assert!(heartbeat.beats_sent() >= 1);
    assert_eq!(
        monitor.expired(Instant::now() + Duration::from_secs(1)),
        vec!["Sleap"]
    );
}
