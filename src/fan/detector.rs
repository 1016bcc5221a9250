// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! QM2 card auto-detection.
//!
//! `hal_app --se_enum` prints one enclosure per line, e.g.
//!
//! ```text
//! enc_id  model     enc_sys_id    ...
//! 0       TS-873A   root          ...
//! 1       QM2-2P    qm2_1_11.32   ...
//! ```
//!
//! A line is taken as the card when it contains `qm2` in any case and also
//! `QM2` verbatim; the identifier is its third whitespace-separated field.
//! The rule is tied to the current firmware's table layout; if QTS changes
//! the column order, detection reports no device rather than guessing.

use super::catalog::{Catalog, DeviceId, FanOperation};
use crate::error::{FanError, Result};
use crate::session::RemoteShellSession;

/// Case-insensitive marker for the device family
const FAMILY_MARKER: &str = "qm2";

/// Exact-case marker that must appear on the same line
const MODEL_MARKER: &str = "QM2";

/// Column holding `enc_sys_id`
const ID_FIELD: usize = 2;

/// Extract the card identifier from enumeration output.
pub fn parse_device_id(output: &str) -> Option<&str> {
    output
        .lines()
        .filter(|line| line.to_lowercase().contains(FAMILY_MARKER) && line.contains(MODEL_MARKER))
        .find_map(|line| line.split_whitespace().nth(ID_FIELD))
}

/// Probe the host for its QM2 card.
///
/// Does not cache the result; callers store it with
/// [`RemoteShellSession::cache_device_id`].
pub async fn detect(session: &mut RemoteShellSession, catalog: &Catalog) -> Result<DeviceId> {
    if !session.is_connected() {
        return Err(FanError::NotConnected);
    }

    let mut last_failure = String::new();
    for command in catalog.candidates(FanOperation::EnumerateDevices, None) {
        let output = session.execute_command(&command).await?;
        if !output.success() {
            last_failure = output.stderr;
            continue;
        }

        return match parse_device_id(&output.stdout) {
            Some(id) => {
                tracing::info!(device = id, "Detected QM2 card");
                Ok(DeviceId::new(id))
            }
            None => {
                tracing::warn!("Device enumeration listed no QM2 card");
                Err(FanError::DeviceNotFound)
            }
        };
    }

    Err(FanError::command_failed(
        FanOperation::EnumerateDevices.action(),
        last_failure,
    ))
}
