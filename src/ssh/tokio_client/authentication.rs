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

//! SSH authentication and server verification.
//!
//! The NAS firmware only offers password logins to the admin account, so
//! password authentication is the single supported method. Host keys are
//! verified according to [`ServerCheckMethod`].

use russh::client::Handle;
use zeroize::Zeroizing;

use super::connection::ClientHandler;

/// An authentification token.
///
/// The secret is wiped from memory when the value is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
}

impl AuthMethod {
    /// Convenience method to create a [`AuthMethod`] from a string literal.
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// Accept any host key. Appliances are usually reached by bare IP and
    /// regenerate their keys on firmware reset.
    NoCheck,
    DefaultKnownHostsFile,
    KnownHostsFile(String),
}

impl ServerCheckMethod {
    /// Convenience method to create a [`ServerCheckMethod`] from a string literal.
    pub fn with_known_hosts_file(known_hosts_file: &str) -> Self {
        Self::KnownHostsFile(known_hosts_file.to_string())
    }
}

/// This takes a handle and performs authentification with the given method.
pub(super) async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), super::Error> {
    match auth {
        AuthMethod::Password(password) => {
            let is_authentificated = handle.authenticate_password(username, &**password).await?;
            if !is_authentificated.success() {
                return Err(super::Error::PasswordWrong);
            }
        }
    }

    Ok(())
}
