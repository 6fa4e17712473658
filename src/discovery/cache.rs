// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide record of the discovery documents already announced.

use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use super::{DiscoveryChannelKey, DiscoveryDocument};

/// Tracks which discovery documents were published.
///
/// All access goes through one async mutex. The request handler holds the
/// guard across "check, build, publish, mark sent", so at most one
/// discovery publish happens per key even under concurrent requests. The
/// lifecycle replay holds it for the whole replay loop.
///
/// Entries are never removed.
///
/// # Examples
///
/// ```
/// use mutedeck2mqtt::discovery::{DiscoveryCache, DiscoveryChannelKey, DiscoveryDocument};
///
/// # async fn example() {
/// let cache = DiscoveryCache::new();
/// let key = DiscoveryChannelKey::new("homeassistant", "office");
///
/// let mut guard = cache.lock().await;
/// if !guard.is_sent(&key) {
///     // publish here, then:
///     guard.mark_sent(key.clone(), DiscoveryDocument::build("office", "mutedeck2mqtt"));
/// }
/// assert!(guard.is_sent(&key));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    entries: Mutex<HashMap<DiscoveryChannelKey, DiscoveryDocument>>,
}

impl DiscoveryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the cache lock.
    pub async fn lock(&self) -> DiscoveryGuard<'_> {
        DiscoveryGuard {
            entries: self.entries.lock().await,
        }
    }

    /// Returns every stored document.
    ///
    /// Order is unspecified.
    pub async fn snapshot(&self) -> Vec<(DiscoveryChannelKey, DiscoveryDocument)> {
        self.lock().await.entries()
    }

    /// Returns the number of keys marked sent.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns whether no key has been marked sent yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Exclusive access to the discovery cache.
///
/// Dropping the guard releases the lock.
#[derive(Debug)]
pub struct DiscoveryGuard<'a> {
    entries: MutexGuard<'a, HashMap<DiscoveryChannelKey, DiscoveryDocument>>,
}

impl DiscoveryGuard<'_> {
    /// Returns whether a discovery document was already sent for the key.
    ///
    /// When this returns `false` the caller is expected to build and publish
    /// the document, then call [`mark_sent`](Self::mark_sent) on success.
    #[must_use]
    pub fn is_sent(&self, key: &DiscoveryChannelKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Marks the key as sent and stores the published document.
    ///
    /// Marking an already sent key replaces its stored document.
    pub fn mark_sent(&mut self, key: DiscoveryChannelKey, document: DiscoveryDocument) {
        self.entries.insert(key, document);
    }

    /// Returns every stored document.
    ///
    /// Order is unspecified.
    #[must_use]
    pub fn entries(&self) -> Vec<(DiscoveryChannelKey, DiscoveryDocument)> {
        self.entries
            .iter()
            .map(|(key, doc)| (key.clone(), doc.clone()))
            .collect()
    }

    /// Returns the number of keys marked sent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no key has been marked sent yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn key(topic: &str) -> DiscoveryChannelKey {
        DiscoveryChannelKey::new("homeassistant", topic)
    }

    #[tokio::test]
    async fn new_cache_is_empty() {
        let cache = DiscoveryCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.snapshot().await.is_empty());
        assert!(!cache.lock().await.is_sent(&key("office")));
    }

    #[tokio::test]
    async fn mark_sent_is_idempotent() {
        let cache = DiscoveryCache::new();
        let doc = DiscoveryDocument::build("office", "mutedeck2mqtt");
        {
            let mut guard = cache.lock().await;
            guard.mark_sent(key("office"), doc.clone());
            guard.mark_sent(key("office"), doc.clone());
            assert!(guard.is_sent(&key("office")));
            assert_eq!(guard.len(), 1);
        }
        assert_eq!(cache.snapshot().await, vec![(key("office"), doc)]);
    }

    #[tokio::test]
    async fn snapshot_is_exhaustive() {
        let cache = DiscoveryCache::new();
        {
            let mut guard = cache.lock().await;
            for topic in ["a", "b", "c"] {
                guard.mark_sent(key(topic), DiscoveryDocument::build(topic, "p"));
            }
        }

        let mut keys: Vec<String> = cache
            .snapshot()
            .await
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "homeassistant/device/mutedeck2mqtt_device_a/config",
                "homeassistant/device/mutedeck2mqtt_device_b/config",
                "homeassistant/device/mutedeck2mqtt_device_c/config",
            ]
        );
    }

    #[tokio::test]
    async fn unmarked_key_stays_unsent() {
        let cache = DiscoveryCache::new();
        {
            let guard = cache.lock().await;
            assert!(!guard.is_sent(&key("office")));
            // publish failed, guard dropped without marking
        }
        assert!(!cache.lock().await.is_sent(&key("office")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn check_then_mark_is_atomic() {
        let cache = Arc::new(DiscoveryCache::new());
        let winners = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let winners = Arc::clone(&winners);
            handles.push(tokio::spawn(async move {
                let mut guard = cache.lock().await;
                if !guard.is_sent(&key("shared")) {
                    tokio::task::yield_now().await;
                    winners.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    guard.mark_sent(key("shared"), DiscoveryDocument::build("shared", "p"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(winners.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }
}
