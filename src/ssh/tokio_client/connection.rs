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

//! SSH connection management and establishment.
//!
//! This module handles the low-level SSH connection establishment,
//! including address resolution, the bounded handshake, bounded
//! authentication, and host key verification.

use russh::client::{Config, Handle, Handler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, io};

use super::authentication::{AuthMethod, ServerCheckMethod};

/// Upper bounds for the two phases of [`Client::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTimeouts {
    /// TCP connect plus SSH handshake.
    pub connect: Duration,
    /// Authentication exchange after the handshake.
    pub auth: Duration,
}

impl Default for ConnectTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            auth: Duration::from_secs(10),
        }
    }
}

/// A ssh connection to a remote server.
///
/// After creating a `Client` by [`connect`]ing to a remote host,
/// use [`execute`] to send commands and receive results through the connections.
///
/// [`connect`]: Client::connect
/// [`execute`]: Client::execute
///
/// # Examples
///
/// ```no_run
/// use nasfan::ssh::tokio_client::{AuthMethod, Client, ConnectTimeouts, ServerCheckMethod};
/// #[tokio::main]
/// async fn main() -> Result<(), nasfan::ssh::tokio_client::Error> {
///     let client = Client::connect(
///         ("192.168.1.20", 22),
///         "admin",
///         AuthMethod::with_password("secret"),
///         ServerCheckMethod::NoCheck,
///         ConnectTimeouts::default(),
///     ).await?;
///
///     let result = client.execute("echo Hello SSH").await?;
///     assert_eq!(result.stdout, "Hello SSH\n");
///     assert_eq!(result.exit_status, 0);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) connection_handle: Arc<Handle<ClientHandler>>,
    pub(super) username: String,
    pub(super) address: SocketAddr,
}

impl Client {
    /// Open a ssh connection to a remote host.
    ///
    /// `addr` is resolved first; each resolved address is tried until one
    /// completes the handshake within `timeouts.connect`. Authentication is
    /// attempted only on that first successful connection and must finish
    /// within `timeouts.auth`.
    pub async fn connect(
        addr: (&str, u16),
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
        timeouts: ConnectTimeouts,
    ) -> Result<Self, super::Error> {
        let config = Arc::new(Config::default());
        let (hostname, port) = addr;

        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname, port))
            .await
            .map_err(super::Error::AddressInvalid)?
            .collect();

        let mut connect_res = Err(super::Error::AddressInvalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )));
        for socket_addr in socket_addrs {
            let handler = ClientHandler {
                hostname: hostname.to_string(),
                host: socket_addr,
                server_check: server_check.clone(),
            };
            let attempt = tokio::time::timeout(
                timeouts.connect,
                russh::client::connect(config.clone(), socket_addr, handler),
            )
            .await;
            match attempt {
                Ok(Ok(h)) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Ok(Err(e)) => connect_res = Err(e),
                Err(_) => {
                    connect_res = Err(super::Error::ConnectTimeout(timeouts.connect.as_secs()))
                }
            }
        }
        let (address, mut handle) = connect_res?;
        let username = username.to_string();

        match tokio::time::timeout(
            timeouts.auth,
            super::authentication::authenticate(&mut handle, &username, auth),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(super::Error::AuthTimeout(timeouts.auth.as_secs())),
        }

        Ok(Self {
            connection_handle: Arc::new(handle),
            username,
            address,
        })
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), super::Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(super::Error::SshError)
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl Handler for ClientHandler {
    type Error = super::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.server_check {
            ServerCheckMethod::NoCheck => Ok(true),
            ServerCheckMethod::KnownHostsFile(known_hosts_path) => {
                let result = russh::keys::check_known_hosts_path(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                    known_hosts_path,
                )
                .map_err(|_| super::Error::ServerCheckFailed)?;

                Ok(result)
            }
            ServerCheckMethod::DefaultKnownHostsFile => {
                let result = russh::keys::check_known_hosts(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                )
                .map_err(|_| super::Error::ServerCheckFailed)?;

                Ok(result)
            }
        }
    }
}
