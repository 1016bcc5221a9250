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

//! Failure taxonomy for fan-control operations.
//!
//! Every variant is recovered where it originates and surfaced to callers as
//! a structured `{ ok: false, message }` result; the [`Display`] text is that
//! message.
//!
//! [`Display`]: std::fmt::Display

use thiserror::Error;

use crate::ssh::tokio_client;

/// Errors surfaced by the session, detector and fan controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanError {
    #[error("Authentication failed. Please check username and password.")]
    AuthenticationFailure,

    /// Handshake or protocol failure while establishing the channel.
    #[error("SSH connection error: {0}")]
    TransportFailure(String),

    #[error("Connection timeout. Please check the IP address and network connectivity.")]
    Timeout,

    #[error("Could not resolve hostname. Please check the IP address.")]
    NameResolutionFailure,

    /// Any other connect-time failure (refused, unreachable, ...).
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// The channel opened but the no-op verification command failed.
    #[error("Connection test failed: {0}")]
    VerificationFailed(String),

    #[error("Not connected to NAS")]
    NotConnected,

    #[error("Invalid fan speed value: {0}")]
    InvalidSpeedValue(String),

    #[error("No QM2 card found. Make sure you have a QM2 expansion card installed.")]
    DeviceNotFound,

    /// A remote command exited nonzero or faulted mid-flight.
    #[error("Failed to {action}: {detail}")]
    CommandFailed { action: &'static str, detail: String },

    #[error("Could not retrieve fan status")]
    StatusUnavailable,
}

impl FanError {
    pub(crate) fn command_failed(action: &'static str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        FanError::CommandFailed {
            action,
            detail: if detail.is_empty() {
                "Unknown error".to_string()
            } else {
                detail
            },
        }
    }
}

impl From<tokio_client::Error> for FanError {
    fn from(err: tokio_client::Error) -> Self {
        match err {
            tokio_client::Error::PasswordWrong => FanError::AuthenticationFailure,
            tokio_client::Error::ConnectTimeout(_) | tokio_client::Error::AuthTimeout(_) => {
                FanError::Timeout
            }
            tokio_client::Error::AddressInvalid(_) => FanError::NameResolutionFailure,
            ref e if e.is_io() => FanError::Unexpected(e.to_string()),
            tokio_client::Error::ServerCheckFailed | tokio_client::Error::SshError(_) => {
                FanError::TransportFailure(err.to_string())
            }
            other => FanError::Unexpected(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FanError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_connect_errors_map_to_taxonomy() {
        assert_eq!(
            FanError::from(tokio_client::Error::PasswordWrong),
            FanError::AuthenticationFailure
        );
        assert_eq!(
            FanError::from(tokio_client::Error::ConnectTimeout(10)),
            FanError::Timeout
        );
        assert_eq!(
            FanError::from(tokio_client::Error::AuthTimeout(10)),
            FanError::Timeout
        );
        assert_eq!(
            FanError::from(tokio_client::Error::AddressInvalid(io::Error::new(
                io::ErrorKind::NotFound,
                "no such host"
            ))),
            FanError::NameResolutionFailure
        );
        assert!(matches!(
            FanError::from(tokio_client::Error::ServerCheckFailed),
            FanError::TransportFailure(_)
        ));
    }

    #[test]
    fn test_socket_failures_are_unexpected() {
        let refused = tokio_client::Error::SshError(russh::Error::IO(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        assert!(matches!(FanError::from(refused), FanError::Unexpected(_)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(FanError::NotConnected.to_string(), "Not connected to NAS");
        assert_eq!(
            FanError::InvalidSpeedValue("turbo".into()).to_string(),
            "Invalid fan speed value: turbo"
        );
        assert_eq!(
            FanError::command_failed("set fan speed", "").to_string(),
            "Failed to set fan speed: Unknown error"
        );
        assert_eq!(
            FanError::command_failed("set fan mode", "permission denied").to_string(),
            "Failed to set fan mode: permission denied"
        );
    }
}
