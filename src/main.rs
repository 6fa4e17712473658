// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `mutedeck2mqtt` service entry point.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mutedeck2mqtt::{Bridge, Config, logging, server};

#[tokio::main]
async fn main() -> mutedeck2mqtt::Result<()> {
    let config = Config::parse();
    logging::init(config.log_level);

    tracing::info!(host = %config.mqtt_host, port = config.mqtt_port, "Using MQTT server");

    let (broker, lifecycle) = match config.broker_builder().build().await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to MQTT broker");
            return Err(e.into());
        }
    };

    let bridge = Arc::new(
        Bridge::new(broker, config.discovery_prefix.as_str())
            .with_discovery_settle(config.discovery_settle()),
    );
    tokio::spawn(bridge.lifecycle_listener().run(lifecycle));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for MuteDeck webhooks");

    server::serve(listener, bridge).await
}
