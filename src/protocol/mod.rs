// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publishing to the MQTT broker.
//!
//! - [`Transport`]: raw, non-retained publish capability
//! - [`Publisher`]: serializes discovery documents and status records onto a transport
//! - [`MqttBroker`]: the rumqttc-backed transport used in production

mod mqtt_broker;

pub use mqtt_broker::{
    DEFAULT_CLIENT_ID, LIFECYCLE_TOPIC, MqttBroker, MqttBrokerBuilder, MqttBrokerConfig,
};

use std::future::Future;
use std::sync::Arc;

use crate::discovery::{DiscoveryChannelKey, DiscoveryDocument};
use crate::error::PublishError;
use crate::status::StatusRecord;

/// A capability to publish messages to a broker.
///
/// Messages are published with QoS 0 and without the retain flag. The
/// returned future resolves once the client accepted the message or failed.
pub trait Transport: Send + Sync {
    /// Publishes a payload to a topic.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` carrying the client-reported cause.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send {
        (**self).publish(topic, payload)
    }
}

/// Publishes bridge messages onto a [`Transport`].
#[derive(Debug, Clone)]
pub struct Publisher<T> {
    transport: T,
}

impl<T: Transport> Publisher<T> {
    /// Wraps a transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Publishes a discovery document on its config topic.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if encoding or the publish fails.
    pub async fn publish_discovery(
        &self,
        key: &DiscoveryChannelKey,
        document: &DiscoveryDocument,
    ) -> Result<(), PublishError> {
        let payload = document.to_json()?;
        self.transport.publish(key.as_str(), payload).await?;
        tracing::debug!(topic = %key, "Published discovery document");
        Ok(())
    }

    /// Publishes a status record on its status channel.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if encoding or the publish fails.
    pub async fn publish_status(
        &self,
        channel: &str,
        record: &StatusRecord,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(record)?;
        self.transport.publish(channel, payload).await
    }
}
