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

//! Configuration schema for nasfan.
//!
//! # Example YAML
//!
//! ```yaml
//! ssh:
//!   connect_timeout: 10
//!   auth_timeout: 10
//!   command_timeout: 30
//!   host_key_check: known-hosts
//!   known_hosts_file: /home/admin/.ssh/known_hosts
//!
//! log:
//!   capacity: 100
//!
//! catalog:
//!   legacy_fallback: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::fan::Catalog;
use crate::session::{SessionSettings, DEFAULT_LOG_CAPACITY};
use crate::ssh::tokio_client::{ConnectTimeouts, ServerCheckMethod};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NasfanConfig {
    /// SSH connection settings.
    pub ssh: SshSettings,

    /// Command log settings.
    pub log: LogSettings,

    /// Command catalog settings.
    pub catalog: CatalogSettings,
}

impl NasfanConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            command_timeout: Duration::from_secs(self.ssh.command_timeout),
            log_capacity: self.log.capacity,
        }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new().with_legacy_fallback(self.catalog.legacy_fallback)
    }
}

/// SSH connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshSettings {
    /// Seconds allowed for TCP connect plus handshake.
    ///
    /// Default: 10
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Seconds allowed for authentication.
    ///
    /// Default: 10
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout: u64,

    /// Seconds a single remote command may run.
    ///
    /// Default: 30
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// Host key verification policy.
    ///
    /// Default: none (accept any key)
    pub host_key_check: HostKeyCheck,

    /// known_hosts file used with `host_key_check: known-hosts`.
    /// Falls back to `~/.ssh/known_hosts` when unset.
    pub known_hosts_file: Option<PathBuf>,
}

impl SshSettings {
    pub fn connect_timeouts(&self) -> ConnectTimeouts {
        ConnectTimeouts {
            connect: Duration::from_secs(self.connect_timeout),
            auth: Duration::from_secs(self.auth_timeout),
        }
    }

    pub fn server_check(&self) -> ServerCheckMethod {
        match (&self.host_key_check, &self.known_hosts_file) {
            (HostKeyCheck::None, _) => ServerCheckMethod::NoCheck,
            (HostKeyCheck::KnownHosts, Some(path)) => {
                ServerCheckMethod::with_known_hosts_file(&path.to_string_lossy())
            }
            (HostKeyCheck::KnownHosts, None) => ServerCheckMethod::DefaultKnownHostsFile,
        }
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            auth_timeout: default_auth_timeout(),
            command_timeout: default_command_timeout(),
            host_key_check: HostKeyCheck::default(),
            known_hosts_file: None,
        }
    }
}

/// Host key verification policy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyCheck {
    #[default]
    None,
    KnownHosts,
}

/// Command log settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    /// Entries kept per session before the oldest is evicted.
    ///
    /// Default: 100
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

/// Command catalog settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    /// Try `qcontrol` / procfs / hwmon commands when `hal_app` fails.
    ///
    /// Default: false
    pub legacy_fallback: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    30
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NasfanConfig::default();
        assert_eq!(config.ssh.connect_timeout, 10);
        assert_eq!(config.ssh.auth_timeout, 10);
        assert_eq!(config.ssh.command_timeout, 30);
        assert_eq!(config.log.capacity, 100);
        assert!(!config.catalog.legacy_fallback);
        assert_eq!(config.ssh.server_check(), ServerCheckMethod::NoCheck);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: NasfanConfig = serde_yaml::from_str("ssh:\n  command_timeout: 45\n").unwrap();
        assert_eq!(config.ssh.command_timeout, 45);
        assert_eq!(config.ssh.connect_timeout, 10);
        assert_eq!(config.log.capacity, 100);
    }

    #[test]
    fn test_known_hosts_policy() {
        let mut ssh = SshSettings {
            host_key_check: HostKeyCheck::KnownHosts,
            ..SshSettings::default()
        };
        assert_eq!(ssh.server_check(), ServerCheckMethod::DefaultKnownHostsFile);

        ssh.known_hosts_file = Some(PathBuf::from("/etc/nasfan/known_hosts"));
        assert_eq!(
            ssh.server_check(),
            ServerCheckMethod::KnownHostsFile("/etc/nasfan/known_hosts".to_string())
        );
    }

    #[test]
    fn test_session_settings() {
        let mut config = NasfanConfig::default();
        config.ssh.command_timeout = 5;
        config.log.capacity = 20;

        let settings = config.session_settings();
        assert_eq!(settings.command_timeout, Duration::from_secs(5));
        assert_eq!(settings.log_capacity, 20);
    }
}
