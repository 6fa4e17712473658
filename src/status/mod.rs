// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound MuteDeck status records.
//!
//! MuteDeck posts its call state periodically as a flat JSON object. This
//! module decodes that body, checks that the six fields the bridge exposes
//! are present and normalizes the `control` field into a display label.
//! Every other key is passed through to MQTT untouched.
//!
//! # Examples
//!
//! ```
//! use mutedeck2mqtt::status::StatusRecord;
//!
//! let body = br#"{"call":"active","control":"zoom-meeting","mute":"inactive",
//!     "record":"disabled","share":"disabled","video":"active"}"#;
//!
//! let record = StatusRecord::from_slice(body)?;
//! assert_eq!(record.get("control"), Some(&serde_json::json!("Zoom")));
//! # Ok::<(), mutedeck2mqtt::error::RequestError>(())
//! ```

mod platform;
mod target;

pub use platform::{platform_label, title_case};
pub use target::{DEFAULT_PREFIX, DEFAULT_TOPIC, StatusTarget};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RequestError;

/// Fields every status record must carry, in validation order.
pub const REQUIRED_FIELDS: [&str; 6] = ["call", "control", "mute", "record", "share", "video"];

/// A validated status record, ready to be published.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatusRecord {
    fields: Map<String, Value>,
}

impl StatusRecord {
    /// Decodes, validates and normalizes a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Decode`] if the body is not a JSON object and
    /// [`RequestError::MissingField`] naming the first absent required key.
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let fields: Map<String, Value> = serde_json::from_slice(body)?;
        Self::from_map(fields)
    }

    /// Validates and normalizes an already decoded record.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingField`] naming the first absent
    /// required key.
    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self, RequestError> {
        if let Some(missing) = REQUIRED_FIELDS
            .into_iter()
            .find(|key| !fields.contains_key(*key))
        {
            return Err(RequestError::MissingField(missing));
        }

        if let Some(Value::String(control)) = fields.get_mut("control") {
            *control = platform_label(control);
        }

        Ok(Self { fields })
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}
