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

//! Error type for the low-level SSH client.

use std::io;

/// Errors raised while connecting to, authenticating against, or running
/// commands on a remote host.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Password authentication failed")]
    PasswordWrong,
    #[error("Host key verification failed")]
    ServerCheckFailed,
    #[error("Unable to resolve address: {0}")]
    AddressInvalid(io::Error),
    #[error("Connection attempt did not complete within {0} seconds")]
    ConnectTimeout(u64),
    #[error("Authentication did not complete within {0} seconds")]
    AuthTimeout(u64),
    #[error("The executed command didn't send an exit code")]
    CommandDidntExit,
    #[error("The connection has been closed")]
    ConnectionClosed,
    #[error(transparent)]
    SshError(#[from] russh::Error),
}

impl Error {
    /// True for socket-level failures (refused, reset, unreachable) as
    /// opposed to SSH protocol failures.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::SshError(russh::Error::IO(_)))
    }
}
