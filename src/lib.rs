// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `mutedeck2mqtt` - Bridge MuteDeck call status to MQTT and Home Assistant.
//!
//! MuteDeck periodically posts the state of the current call (microphone,
//! camera, screen sharing, recording, meeting platform) to a webhook. This
//! crate receives that webhook, republishes the status on an MQTT topic and
//! announces a matching device to Home Assistant through MQTT discovery.
//!
//! # Flow
//!
//! 1. [`status::StatusRecord`] decodes and validates the webhook body
//! 2. [`Bridge`] announces the device once per topic, then publishes the status
//! 3. [`lifecycle::LifecycleListener`] replays announcements when Home
//!    Assistant reports `online`
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mutedeck2mqtt::{Bridge, protocol::MqttBroker, server};
//!
//! #[tokio::main]
//! async fn main() -> mutedeck2mqtt::Result<()> {
//!     let (broker, lifecycle) = MqttBroker::builder()
//!         .host("192.168.1.50")
//!         .credentials("user", "password")
//!         .build()
//!         .await?;
//!
//!     let bridge = Arc::new(Bridge::new(broker, "homeassistant"));
//!     tokio::spawn(bridge.lifecycle_listener().run(lifecycle));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     server::serve(listener, bridge).await
//! }
//! ```

mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod status;

pub use bridge::{Bridge, DEFAULT_DISCOVERY_SETTLE};
pub use config::{Config, LogLevel};
pub use discovery::{DiscoveryCache, DiscoveryChannelKey, DiscoveryDocument};
pub use error::{ConnectionError, Error, PublishError, RequestError, Result};
pub use lifecycle::{ConsumerStatus, LifecycleListener};
pub use protocol::{MqttBroker, MqttBrokerBuilder, Publisher, Transport};
pub use status::{StatusRecord, StatusTarget};
