// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection.
//!
//! The bridge keeps a single persistent connection. It publishes discovery
//! documents and status records, and listens on the Home Assistant status
//! topic so that discovery can be replayed when Home Assistant restarts.
//!
//! # Examples
//!
//! ```no_run
//! use mutedeck2mqtt::protocol::MqttBroker;
//!
//! # async fn example() -> mutedeck2mqtt::Result<()> {
//! let (broker, mut lifecycle) = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! while let Some(payload) = lifecycle.recv().await {
//!     println!("Home Assistant is {payload}");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ConnectionError, PublishError};
use crate::protocol::Transport;

/// Topic Home Assistant publishes its birth and last will messages on.
pub const LIFECYCLE_TOPIC: &str = "homeassistant/status";

/// Default MQTT client identifier.
pub const DEFAULT_CLIENT_ID: &str = "mutedeck2mqtt";

/// Buffered lifecycle payloads; further payloads are dropped until the listener catches up.
const LIFECYCLE_CHANNEL_CAPACITY: usize = 16;

/// Delay between reconnection attempts after an event loop error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// A persistent MQTT broker connection.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`). It implements
/// [`Transport`], so it can be handed to a
/// [`Publisher`](crate::protocol::Publisher).
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing.
    client: AsyncClient,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status.
    connected: AtomicBool,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.config.client_id
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner
            .client
            .disconnect()
            .await
            .map_err(ConnectionError::Mqtt)?;

        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }
}

impl Transport for MqttBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }

        self.inner
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(PublishError::Mqtt)
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("client_id", &self.inner.config.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use mutedeck2mqtt::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> mutedeck2mqtt::Result<()> {
/// let (broker, _lifecycle) = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .client_id("mutedeck2mqtt")
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the client identifier (default: `mutedeck2mqtt`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// Returns the broker together with a receiver of every payload
    /// published on [`LIFECYCLE_TOPIC`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<(MqttBroker, mpsc::Receiver<String>), ConnectionError> {
        if self.config.host.is_empty() {
            return Err(ConnectionError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let mut mqtt_options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let broker = MqttBroker {
            inner: Arc::new(MqttBrokerInner {
                client,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
            }),
        };

        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(LIFECYCLE_CHANNEL_CAPACITY);
        let (connack_tx, connack_rx) = oneshot::channel();

        let broker_clone = broker.clone();
        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, lifecycle_tx, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    client_id = %self.config.client_id,
                    "Connected to MQTT broker"
                );
            }
            Ok(Ok(Err(cause))) => {
                return Err(ConnectionError::ConnectionFailed(cause));
            }
            Ok(Err(_)) => {
                return Err(ConnectionError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ConnectionError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok((broker, lifecycle_rx))
    }
}

/// Drives the MQTT event loop for the lifetime of the connection.
///
/// Subscribes to the lifecycle topic on every ConnAck (sessions are clean)
/// and forwards its payloads. Errors are logged and the loop keeps polling,
/// which makes rumqttc reconnect. The task ends on an explicit disconnect.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    lifecycle_tx: mpsc::Sender<String>,
    connack_tx: Option<oneshot::Sender<Result<(), String>>>,
) {
    use rumqttc::{Event, Outgoing, Packet};

    let mut connack_tx = connack_tx;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);

                // The request channel is drained by this loop, so a blocking
                // subscribe here could deadlock.
                if let Err(e) = broker
                    .inner
                    .client
                    .try_subscribe(LIFECYCLE_TOPIC, QoS::AtMostOnce)
                {
                    tracing::error!(topic = LIFECYCLE_TOPIC, error = %e, "Failed to subscribe to lifecycle topic");
                }

                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic != LIFECYCLE_TOPIC {
                    continue;
                }
                let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                tracing::debug!(topic = %publish.topic, payload = %payload, "MQTT message received");
                forward_lifecycle(&lifecycle_tx, payload);
            }
            Ok(Event::Incoming(Packet::Disconnect) | Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT broker event loop error");
                broker.inner.connected.store(false, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    // Never connected: let `build` report the cause.
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Queues a lifecycle payload without blocking the event loop.
///
/// Returns `false` if the payload was dropped because the channel is full or
/// the receiver is gone.
fn forward_lifecycle(lifecycle_tx: &mpsc::Sender<String>, payload: String) -> bool {
    match lifecycle_tx.try_send(payload) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(payload)) => {
            tracing::warn!(payload = %payload, "Lifecycle channel full, dropping status message");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("Lifecycle receiver dropped, ignoring status message");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttBrokerBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert_eq!(builder.config.client_id, "mutedeck2mqtt");
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_chain() {
        let builder = MqttBrokerBuilder::default()
            .host("192.168.1.50")
            .port(8883)
            .client_id("bridge")
            .credentials("admin", "secret")
            .keep_alive(Duration::from_secs(45))
            .connection_timeout(Duration::from_secs(15));

        assert_eq!(builder.config.host, "192.168.1.50");
        assert_eq!(builder.config.port, 8883);
        assert_eq!(builder.config.client_id, "bridge");
        let creds = builder.config.credentials.unwrap();
        assert_eq!(creds.0, "admin");
        assert_eq!(creds.1, "secret");
        assert_eq!(builder.config.keep_alive, Duration::from_secs(45));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn builder_missing_host_fails() {
        let result = MqttBrokerBuilder::default().build().await;
        let err = result.unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn unreachable_broker_fails() {
        let result = MqttBrokerBuilder::default()
            .host("127.0.0.1")
            .port(1)
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;
        let cause = match result {
            Err(ConnectionError::ConnectionFailed(cause)) => cause,
            other => panic!("expected ConnectionFailed, got {other:?}"),
        };
        assert!(!cause.contains("terminated unexpectedly"), "{cause}");
        assert!(!cause.contains("timeout"), "{cause}");
    }

    #[test]
    fn forward_lifecycle_queues_payload() {
        let (tx, mut rx) = mpsc::channel(1);

        assert!(forward_lifecycle(&tx, "online".to_string()));
        assert_eq!(rx.try_recv().unwrap(), "online");
    }

    #[test]
    fn forward_lifecycle_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);

        assert!(forward_lifecycle(&tx, "offline".to_string()));
        assert!(!forward_lifecycle(&tx, "online".to_string()));

        assert_eq!(rx.try_recv().unwrap(), "offline");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn forward_lifecycle_ignores_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(!forward_lifecycle(&tx, "online".to_string()));
    }
}
