// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display labels for the meeting platform reported in the `control` field.

/// Maps a raw MuteDeck `control` value to the label shown in Home Assistant.
///
/// # Examples
///
/// ```
/// use mutedeck2mqtt::status::platform_label;
///
/// assert_eq!(platform_label("zoom-meeting"), "Zoom");
/// assert_eq!(platform_label("google-meet"), "Google Meet");
/// assert_eq!(platform_label("system"), "System");
/// ```
#[must_use]
pub fn platform_label(raw: &str) -> String {
    if raw.starts_with("zoom") {
        return "Zoom".to_string();
    }
    if raw.starts_with("teams") {
        return "Teams".to_string();
    }
    match raw {
        "webex" => "Webex".to_string(),
        "streamyard" => "StreamYard".to_string(),
        "google-meet" => "Google Meet".to_string(),
        other => title_case(other),
    }
}

/// Replaces underscores with spaces and capitalizes every word.
///
/// A word starts after any character that is not a letter, digit,
/// apostrophe or period. Letters inside a word are lowercased.
#[must_use]
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;

    for ch in raw.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = !matches!(ch, '\'' | '.');
        }
    }

    out
}
