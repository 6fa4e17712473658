// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant lifecycle handling.
//!
//! Discovery documents are not retained on the broker, so Home Assistant
//! forgets them when it restarts. When it comes back it publishes `online`
//! on its status topic, and the [`LifecycleListener`] replays every
//! document announced so far.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::discovery::DiscoveryCache;
use crate::protocol::{Publisher, Transport};

/// Birth payload published by Home Assistant.
pub const ONLINE_PAYLOAD: &str = "online";

/// Last will payload published by Home Assistant.
pub const OFFLINE_PAYLOAD: &str = "offline";

/// Last observed state of the downstream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumerStatus {
    /// No birth message seen yet, or the last one was `offline`.
    #[default]
    OfflineOrUnknown,
    /// The consumer announced itself online.
    Online,
}

impl fmt::Display for ConsumerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OfflineOrUnknown => f.write_str("offline-or-unknown"),
            Self::Online => f.write_str("online"),
        }
    }
}

/// Replays discovery documents when the consumer comes online.
///
/// Usually obtained from [`Bridge::lifecycle_listener`](crate::Bridge::lifecycle_listener)
/// so that it shares the bridge's cache.
#[derive(Debug)]
pub struct LifecycleListener<T> {
    publisher: Publisher<T>,
    cache: Arc<DiscoveryCache>,
    status: RwLock<ConsumerStatus>,
}

impl<T: Transport> LifecycleListener<T> {
    /// Creates a listener replaying the documents stored in `cache`.
    #[must_use]
    pub fn new(publisher: Publisher<T>, cache: Arc<DiscoveryCache>) -> Self {
        Self {
            publisher,
            cache,
            status: RwLock::new(ConsumerStatus::default()),
        }
    }

    /// Returns the last observed consumer status.
    #[must_use]
    pub fn status(&self) -> ConsumerStatus {
        *self.status.read()
    }

    /// Handles one payload from the lifecycle topic.
    ///
    /// `online` triggers a replay and returns the number of documents
    /// republished. Every other payload returns 0.
    pub async fn handle_payload(&self, payload: &str) -> usize {
        match payload {
            ONLINE_PAYLOAD => {
                *self.status.write() = ConsumerStatus::Online;
                tracing::info!("Home Assistant is online, resending discovery messages");
                self.replay().await
            }
            OFFLINE_PAYLOAD => {
                *self.status.write() = ConsumerStatus::OfflineOrUnknown;
                tracing::info!("Home Assistant went offline");
                0
            }
            other => {
                tracing::debug!(payload = %other, "Ignoring lifecycle payload");
                0
            }
        }
    }

    /// Republishes every stored discovery document.
    ///
    /// Holds the cache lock for the whole replay. An entry that fails to
    /// publish is logged and skipped; sent flags are left untouched.
    /// Returns the number of documents republished.
    pub async fn replay(&self) -> usize {
        let guard = self.cache.lock().await;
        let mut resent = 0;

        for (key, document) in guard.entries() {
            match self.publisher.publish_discovery(&key, &document).await {
                Ok(()) => {
                    resent += 1;
                    tracing::info!(topic = %key, "Resent discovery message");
                }
                Err(e) => {
                    tracing::error!(topic = %key, error = %e, "Failed to resend discovery message");
                }
            }
        }

        resent
    }

    /// Consumes lifecycle payloads until the channel closes.
    pub async fn run(self, mut payloads: mpsc::Receiver<String>) {
        while let Some(payload) = payloads.recv().await {
            self.handle_payload(&payload).await;
        }
        tracing::debug!("Lifecycle channel closed");
    }
}
