// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery.
//!
//! Each MuteDeck topic is announced to Home Assistant as one device with six
//! entities. The announcement is published once per topic and process
//! lifetime, and replayed when Home Assistant reports that it came back
//! online.
//!
//! - [`DiscoveryChannelKey`] - The config topic a device is announced on
//! - [`DiscoveryDocument`] - The announcement payload
//! - [`DiscoveryCache`] - The set of announcements already sent

mod cache;
mod document;

pub use cache::{DiscoveryCache, DiscoveryGuard};
pub use document::{Component, CONTROL_OPTIONS, DeviceInfo, DiscoveryDocument, OriginInfo};

use std::fmt;

/// Default Home Assistant discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Object ID shared by every announced device.
pub const OBJECT_ID: &str = "mutedeck2mqtt_device";

/// Discovery config topic for one device topic.
///
/// Formatted as `{discovery_prefix}/device/mutedeck2mqtt_device_{topic}/config`.
///
/// # Examples
///
/// ```
/// use mutedeck2mqtt::discovery::DiscoveryChannelKey;
///
/// let key = DiscoveryChannelKey::new("homeassistant", "MyRoom");
/// assert_eq!(key.as_str(), "homeassistant/device/mutedeck2mqtt_device_MyRoom/config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscoveryChannelKey(String);

impl DiscoveryChannelKey {
    /// Derives the key for a device topic under a discovery prefix.
    #[must_use]
    pub fn new(discovery_prefix: &str, topic: &str) -> Self {
        Self(format!(
            "{discovery_prefix}/device/{OBJECT_ID}_{topic}/config"
        ))
    }

    /// Returns the MQTT topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiscoveryChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DiscoveryChannelKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        let key = DiscoveryChannelKey::new("homeassistant", "mutedeck");
        assert_eq!(
            key.to_string(),
            "homeassistant/device/mutedeck2mqtt_device_mutedeck/config"
        );
    }

    #[test]
    fn key_uses_custom_prefix() {
        let key = DiscoveryChannelKey::new("ha", "desk");
        assert_eq!(key.as_str(), "ha/device/mutedeck2mqtt_device_desk/config");
    }

    #[test]
    fn one_key_per_topic() {
        assert_eq!(
            DiscoveryChannelKey::new("homeassistant", "a"),
            DiscoveryChannelKey::new("homeassistant", "a")
        );
        assert_ne!(
            DiscoveryChannelKey::new("homeassistant", "a"),
            DiscoveryChannelKey::new("homeassistant", "b")
        );
    }
}
