// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant device discovery documents.
//!
//! A single device-level document announces all six MuteDeck entities at
//! once. Field names use Home Assistant's abbreviated discovery keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::OBJECT_ID;
use crate::status::title_case;

/// Command topic for entities that accept no commands.
const NO_REPLY_TOPIC: &str = "mutedeck2mqtt/no-reply";

/// Suffix appended to every entity unique ID.
const UNIQUE_ID_SUFFIX: &str = "mutedeck2mqtt";

const MANUFACTURER: &str = "MuteDeck";
const ORIGIN_NAME: &str = "MuteDeck2MQTT";
const ORIGIN_URL: &str = "https://github.com/chelming/mutedeck2mqtt/";
const ORIGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options offered by the `control` select entity.
pub const CONTROL_OPTIONS: [&str; 6] = ["Zoom", "Teams", "Google Meet", "StreamYard", "Webex", "System"];

/// How an entity derives its state from the status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueTemplate {
    /// `ON` when the field equals `active`.
    ActiveIsOn,
    /// `OFF` when the field equals `active`.
    ActiveIsOff,
    /// The raw field value.
    Passthrough,
}

impl ValueTemplate {
    fn render(self, field: &str) -> String {
        match self {
            Self::ActiveIsOn => {
                format!("{{{{ value_json.{field} != 'active' and 'OFF' or 'ON' }}}}")
            }
            Self::ActiveIsOff => {
                format!("{{{{ value_json.{field} == 'active' and 'OFF' or 'ON' }}}}")
            }
            Self::Passthrough => format!("{{{{ value_json.{field} }}}}"),
        }
    }
}

/// Static description of one exposed status field.
struct EntityDef {
    field: &'static str,
    name: &'static str,
    icon: &'static str,
    platform: &'static str,
    template: ValueTemplate,
    options: &'static [&'static str],
}

// Muting is reported as `active` while the microphone is off, hence the
// inverted template.
const ENTITIES: [EntityDef; 6] = [
    EntityDef {
        field: "call",
        name: "Call",
        icon: "mdi:phone",
        platform: "binary_sensor",
        template: ValueTemplate::ActiveIsOn,
        options: &[],
    },
    EntityDef {
        field: "control",
        name: "Control",
        icon: "mdi:application-cog",
        platform: "select",
        template: ValueTemplate::Passthrough,
        options: &CONTROL_OPTIONS,
    },
    EntityDef {
        field: "mute",
        name: "Microphone",
        icon: "mdi:microphone",
        platform: "binary_sensor",
        template: ValueTemplate::ActiveIsOff,
        options: &[],
    },
    EntityDef {
        field: "record",
        name: "Recording",
        icon: "mdi:record-rec",
        platform: "binary_sensor",
        template: ValueTemplate::ActiveIsOn,
        options: &[],
    },
    EntityDef {
        field: "share",
        name: "Screen sharing",
        icon: "mdi:monitor-share",
        platform: "binary_sensor",
        template: ValueTemplate::ActiveIsOn,
        options: &[],
    },
    EntityDef {
        field: "video",
        name: "Video",
        icon: "mdi:video",
        platform: "binary_sensor",
        template: ValueTemplate::ActiveIsOn,
        options: &[],
    },
];

/// Device block of a discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device identifiers.
    #[serde(rename = "ids")]
    pub identifiers: Vec<String>,
    /// Display name.
    pub name: String,
    /// Manufacturer.
    #[serde(rename = "mf")]
    pub manufacturer: String,
    /// Model, published empty.
    #[serde(rename = "mdl", default)]
    pub model: String,
    /// Device software version, published empty.
    #[serde(rename = "sw", default)]
    pub software_version: String,
    /// Serial number, published empty.
    #[serde(rename = "sn", default)]
    pub serial_number: String,
    /// Hardware version, published empty.
    #[serde(rename = "hw", default)]
    pub hardware_version: String,
}

/// Origin block identifying the software that published the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginInfo {
    /// Software name.
    pub name: String,
    /// Software version.
    #[serde(rename = "sw")]
    pub software_version: String,
    /// Project URL.
    pub url: String,
}

/// One entity inside a device discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Command topic.
    #[serde(rename = "cmd_t")]
    pub command_topic: String,
    /// Whether the entity is enabled when first added.
    #[serde(rename = "en")]
    pub enabled_by_default: bool,
    /// Entity category.
    #[serde(rename = "ent_cat")]
    pub entity_category: String,
    /// Material Design icon.
    pub icon: String,
    /// Display name.
    pub name: String,
    /// Object ID used to derive the entity ID.
    #[serde(rename = "obj_id")]
    pub object_id: String,
    /// Whether Home Assistant should assume state changes.
    #[serde(rename = "opt")]
    pub optimistic: bool,
    /// Selectable options; empty except for `select` entities.
    #[serde(default)]
    pub options: Vec<String>,
    /// Entity platform.
    #[serde(rename = "p")]
    pub platform: String,
    /// Topic the state is read from.
    #[serde(rename = "stat_t")]
    pub state_topic: String,
    /// Unique ID.
    #[serde(rename = "uniq_id")]
    pub unique_id: String,
    /// Template extracting the state from the status record.
    #[serde(rename = "val_tpl")]
    pub value_template: String,
}

/// A device-level Home Assistant discovery document.
///
/// Built with [`DiscoveryDocument::build`]. The entity map is ordered, so
/// the serialized document only depends on its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Device metadata.
    #[serde(rename = "dev")]
    pub device: DeviceInfo,
    /// Origin metadata.
    #[serde(rename = "o")]
    pub origin: OriginInfo,
    /// Entities keyed by `{topic}_{field}`.
    #[serde(rename = "cmps")]
    pub components: BTreeMap<String, Component>,
    /// Shared state topic.
    #[serde(rename = "stat_t")]
    pub state_topic: String,
    /// QoS for state subscriptions.
    pub qos: u8,
}

impl DiscoveryDocument {
    /// Builds the discovery document for a device topic.
    ///
    /// # Arguments
    ///
    /// * `topic` - The logical device identifier
    /// * `prefix` - The routing prefix of the status channel
    ///
    /// # Examples
    ///
    /// ```
    /// use mutedeck2mqtt::discovery::DiscoveryDocument;
    ///
    /// let doc = DiscoveryDocument::build("office", "mutedeck2mqtt");
    /// assert_eq!(doc.state_topic, "mutedeck2mqtt/office");
    /// assert_eq!(doc.components.len(), 6);
    /// assert!(doc.components.contains_key("office_mute"));
    /// ```
    #[must_use]
    pub fn build(topic: &str, prefix: &str) -> Self {
        let state_topic = format!("{prefix}/{topic}");

        let components = ENTITIES
            .iter()
            .map(|entity| {
                let key = format!("{topic}_{}", entity.field);
                let component = Component {
                    command_topic: NO_REPLY_TOPIC.to_string(),
                    enabled_by_default: true,
                    entity_category: "diagnostic".to_string(),
                    icon: entity.icon.to_string(),
                    name: entity.name.to_string(),
                    object_id: key.clone(),
                    optimistic: false,
                    options: entity.options.iter().map(|o| (*o).to_string()).collect(),
                    platform: entity.platform.to_string(),
                    state_topic: state_topic.clone(),
                    unique_id: format!("{key}_{UNIQUE_ID_SUFFIX}"),
                    value_template: entity.template.render(entity.field),
                };
                (key, component)
            })
            .collect();

        Self {
            device: DeviceInfo {
                identifiers: vec![format!("{OBJECT_ID}_{topic}")],
                name: title_case(topic),
                manufacturer: MANUFACTURER.to_string(),
                model: String::new(),
                software_version: String::new(),
                serial_number: String::new(),
                hardware_version: String::new(),
            },
            origin: OriginInfo {
                name: ORIGIN_NAME.to_string(),
                software_version: ORIGIN_VERSION.to_string(),
                url: ORIGIN_URL.to_string(),
            },
            components,
            state_topic,
            qos: 0,
        }
    }

    /// Serializes the document to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
