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

//! Structured results returned to the presentation layer.
//!
//! Field names on the wire follow the JSON the web front end already
//! consumes (`success`, `qm2_enc_sys_id`, `qm2_detected`).

use serde::Serialize;

use crate::session::ConnectionInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectResponse {
    #[serde(rename = "success")]
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<ConnectionInfo>,
    /// Card found by the post-connect detection attempt
    #[serde(rename = "qm2_detected", skip_serializing_if = "Option::is_none")]
    pub detected_device: Option<String>,
}

/// Result of an operation that only reports success and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    #[serde(rename = "success")]
    pub ok: bool,
    pub message: String,
}

impl OperationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanStatusResponse {
    #[serde(rename = "success")]
    pub ok: bool,
    /// Pipe-joined status, or `Unknown` on failure
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_info: Option<ConnectionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    #[serde(rename = "success")]
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_response_wire_names() {
        let json = serde_json::to_value(OperationResponse::failed("Not connected to NAS")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Not connected to NAS");
    }

    #[test]
    fn test_connect_response_omits_absent_fields() {
        let response = ConnectResponse {
            ok: false,
            message: "Authentication failed.".to_string(),
            connection_info: None,
            detected_device: None,
        };
        let json = serde_json::to_value(response).unwrap();
        assert!(json.get("connection_info").is_none());
        assert!(json.get("qm2_detected").is_none());
    }
}
