// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Where a status record is routed on the broker.

/// Topic used when the webhook does not name one.
pub const DEFAULT_TOPIC: &str = "mutedeck";

/// Routing prefix used when the webhook does not name one.
pub const DEFAULT_PREFIX: &str = "mutedeck2mqtt";

/// Logical device and routing prefix of a status webhook.
///
/// Built from the `topic` and `prefix` query parameters. Absent or empty
/// parameters fall back to [`DEFAULT_TOPIC`] and [`DEFAULT_PREFIX`].
///
/// # Examples
///
/// ```
/// use mutedeck2mqtt::status::StatusTarget;
///
/// let target = StatusTarget::new(Some("MyRoom"), None);
/// assert_eq!(target.topic(), "MyRoom");
/// assert_eq!(target.state_topic(), "mutedeck2mqtt/MyRoom");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusTarget {
    topic: Option<String>,
    prefix: Option<String>,
}

impl StatusTarget {
    /// Creates a target from optional topic and prefix values.
    #[must_use]
    pub fn new(topic: Option<&str>, prefix: Option<&str>) -> Self {
        Self {
            topic: topic.map(str::to_string),
            prefix: prefix.map(str::to_string),
        }
    }

    /// Creates a target from decoded query pairs.
    ///
    /// A repeated parameter keeps its first value; unknown parameters are
    /// ignored.
    #[must_use]
    pub fn from_query_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key.as_ref() == name)
                .map(|(_, value)| value.as_ref().to_string())
        };

        Self {
            topic: first("topic"),
            prefix: first("prefix"),
        }
    }

    /// Returns the logical device identifier.
    #[must_use]
    pub fn topic(&self) -> &str {
        non_empty(self.topic.as_deref()).unwrap_or(DEFAULT_TOPIC)
    }

    /// Returns the routing prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        non_empty(self.prefix.as_deref()).unwrap_or(DEFAULT_PREFIX)
    }

    /// Returns the status channel, `{prefix}/{topic}`.
    #[must_use]
    pub fn state_topic(&self) -> String {
        format!("{}/{}", self.prefix(), self.topic())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
