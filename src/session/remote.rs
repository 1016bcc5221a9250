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

//! One authenticated command channel to one NAS.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use super::command_log::{CommandLog, LogEntry, DEFAULT_LOG_CAPACITY};
use super::connection::{Connection, ConnectionInfo};
use crate::error::{FanError, Result};
use crate::fan::DeviceId;
use crate::ssh::{ConnectTarget, Connector, RemoteTransport};

/// No-op run right after authentication to prove the channel executes commands
pub const VERIFY_COMMAND: &str = "echo 'Connection test'";

/// Bound on a graceful close before the transport is simply dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub command_timeout: Duration,
    pub log_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// Outcome of a command that reached the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Trimmed stdout
    pub stdout: String,
    /// Trimmed stderr, or the fault description if the command never exited
    pub stderr: String,
    /// `None` when the transport failed before an exit status arrived
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    fn fault(message: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            exit_status: None,
        }
    }
}

/// A remote shell session: at most one live transport plus its connection
/// record and command log.
///
/// Methods take `&mut self`; callers sharing a session across tasks wrap it
/// in a `tokio::sync::Mutex` (see [`SessionRegistry`](super::SessionRegistry))
/// so that connect, disconnect and command execution never interleave.
pub struct RemoteShellSession {
    connector: Arc<dyn Connector>,
    settings: SessionSettings,
    transport: Option<Box<dyn RemoteTransport>>,
    connection: Option<Connection>,
    log: CommandLog,
}

impl RemoteShellSession {
    /// Create a disconnected session.
    pub fn new(connector: Arc<dyn Connector>, settings: SessionSettings) -> Self {
        Self {
            connector,
            settings,
            transport: None,
            connection: None,
            log: CommandLog::new(settings.log_capacity),
        }
    }

    /// Connect to `target`, replacing any existing connection.
    ///
    /// The new channel must run [`VERIFY_COMMAND`] successfully before the
    /// session counts as connected; otherwise it is torn down again.
    pub async fn connect(
        &mut self,
        target: ConnectTarget,
        secret: Zeroizing<String>,
    ) -> Result<ConnectionInfo> {
        self.disconnect().await;

        let transport = match self.connector.open(&target, secret).await {
            Ok(transport) => transport,
            Err(e) => {
                let err = FanError::from(e);
                tracing::error!(
                    host = %target.host,
                    port = target.port,
                    "{err}"
                );
                return Err(err);
            }
        };
        self.transport = Some(transport);

        let verification = match self.execute_command(VERIFY_COMMAND).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(output.stderr),
            Err(e) => Err(e.to_string()),
        };
        if let Err(detail) = verification {
            self.disconnect().await;
            let err = FanError::VerificationFailed(detail);
            tracing::error!(host = %target.host, "{err}");
            return Err(err);
        }

        let connection = Connection::new(&target);
        let info = connection.info();
        self.connection = Some(connection);

        tracing::info!(
            "SSH connection established to {}:{} as {}",
            target.host,
            target.port,
            target.username
        );
        Ok(info)
    }

    /// Close the channel if there is one and forget the connection.
    ///
    /// Close errors are logged, never returned.
    pub async fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await {
                Ok(Ok(())) => tracing::info!("SSH connection closed"),
                Ok(Err(e)) => tracing::error!("Error closing SSH connection: {e}"),
                Err(_) => tracing::error!(
                    "Error closing SSH connection: no reply within {} seconds",
                    CLOSE_TIMEOUT.as_secs()
                ),
            }
        }
        self.connection = None;
    }

    /// True only if a channel exists and its transport reports itself live.
    pub fn is_connected(&self) -> bool {
        self.transport
            .as_deref()
            .is_some_and(|transport| transport.is_active())
    }

    /// Run `command` with the session's command timeout.
    ///
    /// Fails with [`FanError::NotConnected`] without touching the log when
    /// there is no live channel. Anything that reaches the wire appends
    /// exactly one [`LogEntry`], whether it exits zero, exits nonzero or
    /// faults in transit.
    pub async fn execute_command(&mut self, command: &str) -> Result<CommandOutput> {
        let transport = match self.transport.as_deref() {
            Some(transport) if transport.is_active() => transport,
            _ => return Err(FanError::NotConnected),
        };

        let timeout = self.settings.command_timeout;
        let (output, entry) = match tokio::time::timeout(timeout, transport.exec(command)).await {
            Ok(Ok(result)) => {
                let output = CommandOutput {
                    stdout: result.stdout.trim().to_string(),
                    stderr: result.stderr.trim().to_string(),
                    exit_status: Some(result.exit_status),
                };
                let entry = if output.success() {
                    LogEntry::succeeded(command, output.stdout.clone())
                } else {
                    let error_message = if output.stderr.is_empty() {
                        format!("exit status {}", result.exit_status)
                    } else {
                        output.stderr.clone()
                    };
                    LogEntry::failed(command, output.stderr.clone(), error_message)
                };
                (output, entry)
            }
            Ok(Err(e)) => {
                let message = format!("Command execution failed: {e}");
                tracing::error!("{message}");
                (
                    CommandOutput::fault(message.clone()),
                    LogEntry::failed(command, "", message),
                )
            }
            Err(_) => {
                let message = format!(
                    "Command execution failed: no exit status within {} seconds",
                    timeout.as_secs()
                );
                tracing::error!("{message}");
                (
                    CommandOutput::fault(message.clone()),
                    LogEntry::failed(command, "", message),
                )
            }
        };

        self.log.append(entry);
        tracing::debug!(
            "Command executed: {}, Success: {}",
            command,
            output.success()
        );
        Ok(output)
    }

    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection.as_ref().map(Connection::info)
    }

    /// Device identifier cached by an earlier detection.
    pub fn device_id(&self) -> Option<&DeviceId> {
        self.connection.as_ref()?.device_id.as_ref()
    }

    /// Remember a detected device for the life of the current connection.
    pub fn cache_device_id(&mut self, device: DeviceId) {
        if let Some(connection) = self.connection.as_mut() {
            connection.device_id = Some(device);
        }
    }

    /// Copy of the command log, oldest first.
    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl fmt::Debug for RemoteShellSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteShellSession")
            .field("connected", &self.is_connected())
            .field("connection", &self.connection)
            .field("log_len", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::mock::{MockHost, Reply};
    use crate::ssh::tokio_client::Error;

    fn session(host: &MockHost) -> RemoteShellSession {
        RemoteShellSession::new(host.connector(), SessionSettings::default())
    }

    fn target() -> ConnectTarget {
        ConnectTarget::new("192.168.1.20", 22, "admin")
    }

    fn secret() -> Zeroizing<String> {
        Zeroizing::new("secret".to_string())
    }

    #[tokio::test]
    async fn test_connect_records_connection_and_logs_verification() {
        let host = MockHost::new();
        let mut session = session(&host);

        let info = session.connect(target(), secret()).await.unwrap();

        assert!(session.is_connected());
        assert_eq!(info.host, "192.168.1.20");
        assert!(info.device_id.is_none());
        assert_eq!(host.executed(), vec![VERIFY_COMMAND.to_string()]);
        assert_eq!(session.log_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_verification_tears_down() {
        let host = MockHost::new();
        host.on(VERIFY_COMMAND, Reply::exit(1, "", "sh: restricted"));
        let mut session = session(&host);

        let err = session.connect(target(), secret()).await.unwrap_err();

        assert_eq!(
            err,
            FanError::VerificationFailed("sh: restricted".to_string())
        );
        assert!(!session.is_connected());
        assert!(session.connection_info().is_none());
        assert_eq!(host.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_mapped() {
        let host = MockHost::new();
        host.fail_connect_with(|| Error::PasswordWrong);
        let mut session = session(&host);

        let err = session.connect(target(), secret()).await.unwrap_err();

        assert_eq!(err, FanError::AuthenticationFailure);
        assert!(!session.is_connected());
        assert!(session.log_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_transport() {
        let host = MockHost::new();
        let mut session = session(&host);

        session.connect(target(), secret()).await.unwrap();
        session.cache_device_id(DeviceId::new("qm2_1_11.32"));
        session.connect(target(), secret()).await.unwrap();

        assert_eq!(host.closed_count(), 1);
        assert!(session.device_id().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let host = MockHost::new();
        let mut session = session(&host);

        session.disconnect().await;
        assert!(!session.is_connected());

        session.connect(target(), secret()).await.unwrap();
        session.disconnect().await;
        session.disconnect().await;
        assert!(!session.is_connected());
        assert!(session.connection_info().is_none());
    }

    #[tokio::test]
    async fn test_close_error_is_swallowed() {
        let host = MockHost::new();
        host.fail_close();
        let mut session = session(&host);

        session.connect(target(), secret()).await.unwrap();
        session.disconnect().await;

        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_execute_when_disconnected_does_not_log() {
        let host = MockHost::new();
        let mut session = session(&host);

        let err = session.execute_command("uptime").await.unwrap_err();

        assert_eq!(err, FanError::NotConnected);
        assert!(session.log_snapshot().is_empty());
        assert!(host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_logs_stderr() {
        let host = MockHost::new();
        host.on("false", Reply::exit(1, "ignored", "  nope \n"));
        let mut session = session(&host);
        session.connect(target(), secret()).await.unwrap();
        session.clear_log();

        let output = session.execute_command("false").await.unwrap();

        assert!(!output.success());
        assert_eq!(output.stderr, "nope");
        let log = session.log_snapshot();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].response, "nope");
        assert_eq!(log[0].error_message.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_transport_fault_is_logged_not_raised() {
        let host = MockHost::new();
        host.on("reboot", Reply::Fault);
        let mut session = session(&host);
        session.connect(target(), secret()).await.unwrap();
        session.clear_log();

        let output = session.execute_command("reboot").await.unwrap();

        assert!(!output.success());
        assert!(output.exit_status.is_none());
        let log = session.log_snapshot();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].response, "");
        assert!(log[0]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("Command execution failed:"));
    }

    #[tokio::test]
    async fn test_dead_transport_reports_disconnected() {
        let host = MockHost::new();
        let mut session = session(&host);
        session.connect(target(), secret()).await.unwrap();

        host.drop_link();

        assert!(!session.is_connected());
        assert_eq!(
            session.execute_command("uptime").await.unwrap_err(),
            FanError::NotConnected
        );
    }

    #[tokio::test]
    async fn test_command_timeout_is_logged_as_failure() {
        let host = MockHost::new();
        host.on("sleep 60", Reply::Hang);
        let settings = SessionSettings {
            command_timeout: Duration::from_millis(50),
            ..SessionSettings::default()
        };
        let mut session = RemoteShellSession::new(host.connector(), settings);
        session.connect(target(), secret()).await.unwrap();

        let output = session.execute_command("sleep 60").await.unwrap();

        assert!(!output.success());
        assert!(output.stderr.contains("no exit status within"));
        assert_eq!(session.log_snapshot().len(), 2);
    }
}
