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

//! Entry points for the presentation layer.
//!
//! [`FanService`] resolves the caller's session token, locks that session
//! for the duration of the operation and folds every [`FanError`] into a
//! structured `{ ok: false, message }` result. Nothing here panics or
//! propagates remote-side failures.
//!
//! Host, username and port are expected to be validated by the caller.
//!
//! [`FanError`]: crate::error::FanError

pub mod types;

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::config::NasfanConfig;
use crate::fan::{detect, Catalog, FanController, FanSpeedOption};
use crate::session::{LogEntryView, SessionRegistry, SessionSettings};
use crate::ssh::{ConnectTarget, Connector, SshConnector};

pub use types::{
    CommandResponse, ConnectResponse, ConnectionStatus, FanStatusResponse, OperationResponse,
};

/// Fan-control operations keyed by client session token.
pub struct FanService {
    registry: SessionRegistry,
    catalog: Catalog,
}

impl FanService {
    pub fn new(connector: Arc<dyn Connector>, settings: SessionSettings, catalog: Catalog) -> Self {
        Self {
            registry: SessionRegistry::new(connector, settings),
            catalog,
        }
    }

    /// Build a service that talks SSH according to `config`.
    pub fn from_config(config: &NasfanConfig) -> Self {
        let connector = SshConnector::new(config.ssh.connect_timeouts(), config.ssh.server_check());
        Self::new(
            Arc::new(connector),
            config.session_settings(),
            config.catalog(),
        )
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn fan_speed_options(&self) -> &'static [FanSpeedOption] {
        self.catalog.speed_options()
    }

    /// Connect the caller's session, then try to detect the QM2 card.
    ///
    /// `connection_info` is captured before detection, so its device id is
    /// empty on a fresh connection; a detected card is reported separately.
    pub async fn connect(
        &self,
        token: &str,
        host: &str,
        username: &str,
        secret: &str,
        port: u16,
    ) -> ConnectResponse {
        let session = self.registry.resolve(token).await;
        let mut session = session.lock().await;

        let target = ConnectTarget::new(host, port, username);
        let info = match session
            .connect(target, Zeroizing::new(secret.to_string()))
            .await
        {
            Ok(info) => info,
            Err(e) => {
                return ConnectResponse {
                    ok: false,
                    message: e.to_string(),
                    connection_info: None,
                    detected_device: None,
                }
            }
        };

        let detected_device = match detect(&mut session, &self.catalog).await {
            Ok(device) => {
                let id = device.to_string();
                session.cache_device_id(device);
                Some(id)
            }
            Err(e) => {
                tracing::warn!("QM2 auto-detection after connect failed: {e}");
                None
            }
        };

        ConnectResponse {
            ok: true,
            message: format!("Successfully connected to {host}"),
            connection_info: Some(info),
            detected_device,
        }
    }

    pub async fn disconnect(&self, token: &str) -> OperationResponse {
        let session = self.registry.resolve(token).await;
        session.lock().await.disconnect().await;
        OperationResponse::ok("Disconnected successfully")
    }

    pub async fn set_fan_speed(&self, token: &str, value: &str) -> OperationResponse {
        let session = self.registry.resolve(token).await;
        let mut session = session.lock().await;

        match FanController::new(&mut session, &self.catalog)
            .set_fan_speed(value)
            .await
        {
            Ok(message) => OperationResponse::ok(message),
            Err(e) => OperationResponse::failed(e.to_string()),
        }
    }

    pub async fn get_fan_status(&self, token: &str) -> FanStatusResponse {
        let session = self.registry.resolve(token).await;
        let mut session = session.lock().await;

        match FanController::new(&mut session, &self.catalog)
            .get_fan_status()
            .await
        {
            Ok(status) => FanStatusResponse {
                ok: true,
                status,
                message: "Fan status retrieved".to_string(),
            },
            Err(e) => FanStatusResponse {
                ok: false,
                status: "Unknown".to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Run an arbitrary command on the caller's session.
    pub async fn execute_command(&self, token: &str, command: &str) -> CommandResponse {
        let session = self.registry.resolve(token).await;
        let mut session = session.lock().await;

        match session.execute_command(command).await {
            Ok(output) => CommandResponse {
                ok: output.success(),
                stdout: output.stdout,
                stderr: output.stderr,
            },
            Err(e) => CommandResponse {
                ok: false,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        }
    }

    /// Command log for the caller's session, oldest first.
    pub async fn get_log(&self, token: &str) -> Vec<LogEntryView> {
        let session = self.registry.resolve(token).await;
        let session = session.lock().await;
        session.log_snapshot().iter().map(|entry| entry.view()).collect()
    }

    pub async fn clear_log(&self, token: &str) {
        let session = self.registry.resolve(token).await;
        session.lock().await.clear_log();
    }

    pub async fn connection_status(&self, token: &str) -> ConnectionStatus {
        let session = self.registry.resolve(token).await;
        let session = session.lock().await;

        let is_connected = session.is_connected();
        ConnectionStatus {
            is_connected,
            connection_info: if is_connected {
                session.connection_info()
            } else {
                None
            },
        }
    }

    /// Close every session. Call once at process exit.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
