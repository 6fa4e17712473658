// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration.
//!
//! Every setting is read from an environment variable and can be
//! overridden on the command line. Missing required settings abort startup.

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use tracing::level_filters::LevelFilter;

use crate::discovery::DEFAULT_DISCOVERY_PREFIX;
use crate::protocol::{DEFAULT_CLIENT_ID, MqttBrokerBuilder};

/// Log verbosity selected with `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Request bodies and discovery decisions.
    Debug,
    /// Publishes and lifecycle events.
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Parses a level name case-insensitively, falling back to
    /// [`LogLevel::Info`] for unknown values.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` lets clap use it as a value parser.
    pub fn parse_lossy(value: &str) -> Result<Self, Infallible> {
        Ok(match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "WARN" => Self::Warn,
            "ERROR" => Self::Error,
            _ => Self::Info,
        })
    }

    /// Returns the matching tracing level filter.
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "mutedeck2mqtt", version, about)]
pub struct Config {
    /// MQTT broker host.
    #[arg(long, env = "MQTT_HOST", value_parser = NonEmptyStringValueParser::new())]
    pub mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT username.
    #[arg(long, env = "MQTT_USER", value_parser = NonEmptyStringValueParser::new())]
    pub mqtt_user: String,

    /// MQTT password.
    #[arg(
        long,
        env = "MQTT_PASS",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub mqtt_pass: String,

    /// MQTT client identifier.
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub mqtt_client_id: String,

    /// MQTT keep-alive interval in seconds.
    #[arg(long, env = "MQTT_KEEP_ALIVE_SECS", default_value_t = 30)]
    pub mqtt_keep_alive_secs: u64,

    /// Seconds to wait for the broker to accept the connection.
    #[arg(long, env = "MQTT_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub mqtt_connect_timeout_secs: u64,

    /// Home Assistant discovery prefix.
    #[arg(
        long,
        env = "HOME_ASSISTANT_DISCOVERY_TOPIC",
        default_value = DEFAULT_DISCOVERY_PREFIX
    )]
    pub discovery_prefix: String,

    /// Milliseconds to wait after announcing a new device.
    #[arg(long, env = "DISCOVERY_SETTLE_MS", default_value_t = 2000)]
    pub discovery_settle_ms: u64,

    /// Log level: DEBUG, INFO, WARN or ERROR.
    #[arg(
        long,
        env = "LOG_LEVEL",
        default_value = "INFO",
        value_parser = LogLevel::parse_lossy
    )]
    pub log_level: LogLevel,

    /// HTTP listen port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl Config {
    /// Returns a broker builder populated from this configuration.
    #[must_use]
    pub fn broker_builder(&self) -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
            .host(&self.mqtt_host)
            .port(self.mqtt_port)
            .client_id(&self.mqtt_client_id)
            .credentials(&self.mqtt_user, &self.mqtt_pass)
            .keep_alive(Duration::from_secs(self.mqtt_keep_alive_secs))
            .connection_timeout(Duration::from_secs(self.mqtt_connect_timeout_secs))
    }

    /// Returns the wait after a first discovery publish.
    #[must_use]
    pub fn discovery_settle(&self) -> Duration {
        Duration::from_millis(self.discovery_settle_ms)
    }
}
