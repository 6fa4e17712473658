// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Errors are split by where they surface: inbound webhook requests
//! ([`RequestError`]), outbound MQTT writes ([`PublishError`]) and the
//! broker connection handshake at startup ([`ConnectionError`]).

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound status webhook could not be accepted.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// A message could not be published to the broker.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// The broker connection could not be established.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Binding or serving the HTTP listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while accepting a status webhook.
///
/// All of these map to `400 Bad Request` at the HTTP boundary.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body is not a JSON object.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// A required status key is absent.
    #[error("Missing required key: {0}")]
    MissingField(&'static str),
}

/// Errors raised while publishing to the broker.
///
/// These map to `500 Internal Server Error` at the HTTP boundary.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The MQTT client rejected the publish request.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The broker connection is currently down.
    #[error("not connected to MQTT broker")]
    NotConnected,
}

/// Errors raised while connecting to the broker.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// MQTT client request failed during setup.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
