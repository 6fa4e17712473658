// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide log output.

use crate::config::LogLevel;

/// Installs the global `tracing` subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init(level: LogLevel) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(level.as_level_filter())
        .with_target(false)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
