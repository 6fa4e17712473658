// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT broker connection using mockforge-mqtt.

use std::sync::Arc;
use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use mutedeck2mqtt::discovery::{DiscoveryChannelKey, DiscoveryDocument};
use mutedeck2mqtt::protocol::{LIFECYCLE_TOPIC, MqttBroker, Publisher, Transport};
use mutedeck2mqtt::status::{StatusRecord, StatusTarget};
use mutedeck2mqtt::{Bridge, PublishError};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

async fn connect_with_lifecycle(port: u16, client_id: &str) -> (MqttBroker, mpsc::Receiver<String>) {
    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .client_id(client_id)
        .build()
        .await
        .expect("connect to mock broker")
}

async fn connect(port: u16, client_id: &str) -> MqttBroker {
    connect_with_lifecycle(port, client_id).await.0
}

/// Connects a plain client standing in for Home Assistant.
///
/// Returns the client and a receiver of every message it gets.
async fn home_assistant_client(
    port: u16,
    client_id: &str,
) -> (AsyncClient, mpsc::Receiver<(String, Vec<u8>)>) {
    let options = MqttOptions::new(client_id, "127.0.0.1", port);
    let (client, mut event_loop) = AsyncClient::new(options, 10);
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let _ = tx.send((publish.topic, publish.payload.to_vec())).await;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    sleep(Duration::from_millis(200)).await;
    (client, rx)
}

fn record() -> StatusRecord {
    StatusRecord::from_slice(
        br#"{"call":"active","control":"webex","mute":"active","record":"disabled","share":"active","video":"inactive"}"#,
    )
    .expect("valid record")
}

// ============================================================================
// Connection
// ============================================================================

mod connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port, "bridge_connect").await;

        assert!(broker.is_connected());
        assert_eq!(broker.host(), "127.0.0.1");
        assert_eq!(broker.port(), port);
        assert_eq!(broker.client_id(), "bridge_connect");
    }

    #[tokio::test]
    async fn connect_without_broker_fails() {
        let port = get_test_port();

        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(port)
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn publish_after_disconnect_fails() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port, "bridge_disconnect").await;
        broker.disconnect().await.expect("disconnect");

        let err = broker
            .publish("mutedeck2mqtt/test", b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotConnected));
    }
}

// ============================================================================
// Publishing
// ============================================================================

mod publishing {
    use super::*;

    #[tokio::test]
    async fn publish_discovery_document() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let publisher = Publisher::new(connect(port, "bridge_discovery").await);
        let key = DiscoveryChannelKey::new("homeassistant", "office");
        let document = DiscoveryDocument::build("office", "mutedeck2mqtt");

        let result = publisher.publish_discovery(&key, &document).await;
        assert!(result.is_ok(), "publish failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn publish_status_record() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let publisher = Publisher::new(connect(port, "bridge_status").await);

        let result = publisher
            .publish_status("mutedeck2mqtt/office", &record())
            .await;
        assert!(result.is_ok(), "publish failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn bridge_forwards_through_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = Arc::new(
            Bridge::new(connect(port, "bridge_forward").await, "homeassistant")
                .with_discovery_settle(Duration::ZERO),
        );
        let target = StatusTarget::new(Some("office"), None);

        bridge.forward(&record(), &target).await.expect("first forward");
        bridge.forward(&record(), &target).await.expect("second forward");

        assert_eq!(bridge.cache().len().await, 1);
        assert_eq!(bridge.lifecycle_listener().replay().await, 1);
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn forwards_lifecycle_payloads() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (_broker, mut lifecycle) = connect_with_lifecycle(port, "bridge_lifecycle").await;
        let (ha, _messages) = home_assistant_client(port, "ha_lifecycle").await;

        let mut received = None;
        for _ in 0..20 {
            ha.publish(LIFECYCLE_TOPIC, QoS::AtMostOnce, false, "online")
                .await
                .expect("publish birth message");
            if let Ok(payload) = timeout(Duration::from_millis(250), lifecycle.recv()).await {
                received = payload;
                break;
            }
        }

        assert_eq!(received.as_deref(), Some("online"));
    }

    #[tokio::test]
    async fn online_replays_discovery_through_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (broker, lifecycle) = connect_with_lifecycle(port, "bridge_replay").await;
        let bridge = Bridge::new(broker, "homeassistant").with_discovery_settle(Duration::ZERO);
        bridge
            .forward(&record(), &StatusTarget::new(Some("office"), None))
            .await
            .expect("forward");

        let key = DiscoveryChannelKey::new("homeassistant", "office");
        let (ha, mut messages) = home_assistant_client(port, "ha_replay").await;
        ha.subscribe(key.as_str(), QoS::AtMostOnce)
            .await
            .expect("subscribe to discovery topic");
        sleep(Duration::from_millis(200)).await;

        tokio::spawn(bridge.lifecycle_listener().run(lifecycle));
        ha.publish(LIFECYCLE_TOPIC, QoS::AtMostOnce, false, "online")
            .await
            .expect("publish birth message");

        let (topic, payload) = timeout(Duration::from_secs(5), messages.recv())
            .await
            .expect("replayed discovery within timeout")
            .expect("message");

        assert_eq!(topic, key.as_str());
        let expected = DiscoveryDocument::build("office", "mutedeck2mqtt")
            .to_json()
            .expect("encode");
        assert_eq!(payload, expected);
    }
}
