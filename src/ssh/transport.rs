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

//! Transport seam between the session layer and the SSH client.
//!
//! [`RemoteShellSession`](crate::session::RemoteShellSession) talks to the
//! network only through these traits, so the session, detector and fan
//! controller can be exercised against a scripted transport.

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::tokio_client::{
    AuthMethod, Client, CommandExecutedResult, ConnectTimeouts, Error, ServerCheckMethod,
};

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl ConnectTarget {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
        }
    }
}

/// Opens authenticated channels to a host.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        target: &ConnectTarget,
        secret: Zeroizing<String>,
    ) -> Result<Box<dyn RemoteTransport>, Error>;
}

/// An authenticated, command-executing channel to one host.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Run `command` to completion. Timeouts are the caller's concern.
    async fn exec(&self, command: &str) -> Result<CommandExecutedResult, Error>;

    /// Whether the underlying transport still reports itself live.
    fn is_active(&self) -> bool;

    async fn close(&self) -> Result<(), Error>;
}

/// [`Connector`] backed by the russh [`Client`].
#[derive(Debug, Clone)]
pub struct SshConnector {
    timeouts: ConnectTimeouts,
    server_check: ServerCheckMethod,
}

impl SshConnector {
    pub fn new(timeouts: ConnectTimeouts, server_check: ServerCheckMethod) -> Self {
        Self {
            timeouts,
            server_check,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(ConnectTimeouts::default(), ServerCheckMethod::NoCheck)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(
        &self,
        target: &ConnectTarget,
        secret: Zeroizing<String>,
    ) -> Result<Box<dyn RemoteTransport>, Error> {
        tracing::debug!(
            host = %target.host,
            port = target.port,
            "Opening SSH connection"
        );
        let client = Client::connect(
            (target.host.as_str(), target.port),
            &target.username,
            AuthMethod::Password(secret),
            self.server_check.clone(),
            self.timeouts,
        )
        .await?;

        Ok(Box::new(client))
    }
}

#[async_trait]
impl RemoteTransport for Client {
    async fn exec(&self, command: &str) -> Result<CommandExecutedResult, Error> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.execute(command).await
    }

    fn is_active(&self) -> bool {
        !self.is_closed()
    }

    async fn close(&self) -> Result<(), Error> {
        self.disconnect().await
    }
}
