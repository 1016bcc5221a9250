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

//! Connection record for a live remote session.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::fan::DeviceId;
use crate::ssh::ConnectTarget;

/// Timestamp format for `connected_at` in [`ConnectionInfo`]
const CONNECTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// State of one authenticated, verified connection.
///
/// Created only after the verification command succeeds and dropped on
/// disconnect, so a `Connection` that exists is always a connected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub username: String,
    pub port: u16,
    pub connected_at: DateTime<Local>,
    /// Cached result of device auto-detection
    pub device_id: Option<DeviceId>,
}

impl Connection {
    pub fn new(target: &ConnectTarget) -> Self {
        Self {
            host: target.host.clone(),
            username: target.username.clone(),
            port: target.port,
            connected_at: Local::now(),
            device_id: None,
        }
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            host: self.host.clone(),
            username: self.username.clone(),
            port: self.port,
            connected_at: self.connected_at.format(CONNECTED_AT_FORMAT).to_string(),
            device_id: self.device_id.as_ref().map(|id| id.to_string()),
        }
    }
}

/// Serializable snapshot of a [`Connection`] for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub username: String,
    pub port: u16,
    pub connected_at: String,
    #[serde(rename = "qm2_enc_sys_id")]
    pub device_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_formats_timestamp() {
        let target = ConnectTarget::new("192.168.1.20", 22, "admin");
        let connection = Connection::new(&target);
        let info = connection.info();

        assert_eq!(info.host, "192.168.1.20");
        assert_eq!(info.port, 22);
        assert_eq!(info.connected_at.len(), "2025-01-01 00:00:00".len());
        assert!(info.device_id.is_none());
    }

    #[test]
    fn test_info_serializes_device_under_legacy_key() {
        let target = ConnectTarget::new("nas.local", 2222, "admin");
        let mut connection = Connection::new(&target);
        connection.device_id = Some(DeviceId::new("qm2_1_11.32"));

        let json = serde_json::to_value(connection.info()).unwrap();
        assert_eq!(json["qm2_enc_sys_id"], "qm2_1_11.32");
        assert_eq!(json["port"], 2222);
    }
}
