// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status forwarding with once-per-topic discovery.

use std::sync::Arc;
use std::time::Duration;

use crate::discovery::{DEFAULT_DISCOVERY_PREFIX, DiscoveryCache, DiscoveryChannelKey, DiscoveryDocument};
use crate::error::PublishError;
use crate::lifecycle::LifecycleListener;
use crate::protocol::{Publisher, Transport};
use crate::status::{StatusRecord, StatusTarget};

/// Default wait after a first discovery publish.
pub const DEFAULT_DISCOVERY_SETTLE: Duration = Duration::from_secs(2);

/// Forwards validated status records to the broker.
///
/// Before the first status record of a topic is published, the bridge
/// announces the device to Home Assistant. The announcement is made at most
/// once per topic; a failed announcement is retried by the next request for
/// that topic.
///
/// # Examples
///
/// ```no_run
/// use mutedeck2mqtt::Bridge;
/// use mutedeck2mqtt::protocol::MqttBroker;
/// use mutedeck2mqtt::status::{StatusRecord, StatusTarget};
///
/// # async fn example() -> mutedeck2mqtt::Result<()> {
/// let (broker, _lifecycle) = MqttBroker::builder()
///     .host("192.168.1.50")
///     .credentials("user", "password")
///     .build()
///     .await?;
///
/// let bridge = Bridge::new(broker, "homeassistant");
/// let record = StatusRecord::from_slice(br#"{"call":"active","control":"zoom",
///     "mute":"active","record":"disabled","share":"disabled","video":"active"}"#)?;
/// bridge.forward(&record, &StatusTarget::new(Some("office"), None)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bridge<T> {
    publisher: Publisher<T>,
    cache: Arc<DiscoveryCache>,
    discovery_prefix: String,
    discovery_settle: Duration,
}

impl<T: Transport> Bridge<T> {
    /// Creates a bridge publishing through `transport`, with discovery
    /// documents announced under `discovery_prefix`.
    #[must_use]
    pub fn new(transport: T, discovery_prefix: impl Into<String>) -> Self {
        let mut discovery_prefix = discovery_prefix.into();
        if discovery_prefix.is_empty() {
            discovery_prefix = DEFAULT_DISCOVERY_PREFIX.to_string();
        }

        Self {
            publisher: Publisher::new(transport),
            cache: Arc::new(DiscoveryCache::new()),
            discovery_prefix,
            discovery_settle: DEFAULT_DISCOVERY_SETTLE,
        }
    }

    /// Sets how long to wait after a first discovery publish before the
    /// status record is sent, so Home Assistant can create the entities.
    #[must_use]
    pub fn with_discovery_settle(mut self, settle: Duration) -> Self {
        self.discovery_settle = settle;
        self
    }

    /// Returns the discovery prefix.
    #[must_use]
    pub fn discovery_prefix(&self) -> &str {
        &self.discovery_prefix
    }

    /// Returns the shared discovery cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// Announces the target's device unless it was already announced.
    ///
    /// Returns `true` if a discovery document was published by this call.
    /// The cache lock is held for the whole check, publish and mark
    /// sequence.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if the discovery publish fails. The topic is
    /// then left unmarked.
    pub async fn announce(&self, target: &StatusTarget) -> Result<bool, PublishError> {
        let key = DiscoveryChannelKey::new(&self.discovery_prefix, target.topic());

        tracing::debug!(topic = %key, "Checking discovery topic");
        let mut guard = self.cache.lock().await;
        if guard.is_sent(&key) {
            return Ok(false);
        }

        tracing::debug!(topic = %key, "Preparing discovery document");
        let document = DiscoveryDocument::build(target.topic(), target.prefix());

        if let Err(e) = self.publisher.publish_discovery(&key, &document).await {
            tracing::error!(topic = %key, error = %e, "Failed to publish discovery document");
            return Err(e);
        }
        tracing::info!(topic = %key, "Discovery message sent");

        guard.mark_sent(key, document);

        if !self.discovery_settle.is_zero() {
            tokio::time::sleep(self.discovery_settle).await;
        }

        Ok(true)
    }

    /// Announces the device if needed, then publishes the status record to
    /// `{prefix}/{topic}`.
    ///
    /// A failed status publish does not undo a discovery publish made by
    /// the same call.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if either publish fails.
    pub async fn forward(
        &self,
        record: &StatusRecord,
        target: &StatusTarget,
    ) -> Result<(), PublishError> {
        self.announce(target).await?;

        let state_topic = target.state_topic();
        if let Err(e) = self.publisher.publish_status(&state_topic, record).await {
            tracing::error!(topic = %state_topic, error = %e, "Failed to publish status");
            return Err(e);
        }

        tracing::info!(topic = %state_topic, record = ?record, "Status published");
        Ok(())
    }
}

impl<T: Transport + Clone> Bridge<T> {
    /// Creates a lifecycle listener sharing this bridge's cache and
    /// transport.
    #[must_use]
    pub fn lifecycle_listener(&self) -> LifecycleListener<T> {
        LifecycleListener::new(self.publisher.clone(), Arc::clone(&self.cache))
    }
}
