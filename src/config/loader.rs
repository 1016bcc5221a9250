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

//! Configuration loader.
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. Environment variables (`NASFAN_*`)
//! 2. Configuration file (YAML)
//! 3. Default values

use super::types::NasfanConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a file and the environment.
///
/// # Default Locations
///
/// If no config path is specified, searches in order:
/// 1. `./nasfan.yaml` (current directory)
/// 2. `/etc/nasfan/config.yaml` (system-wide)
/// 3. `$XDG_CONFIG_HOME/nasfan/config.yaml` or `~/.config/nasfan/config.yaml`
///
/// # Environment Variables
///
/// - `NASFAN_CONNECT_TIMEOUT` - Connect/handshake timeout in seconds
/// - `NASFAN_AUTH_TIMEOUT` - Authentication timeout in seconds
/// - `NASFAN_COMMAND_TIMEOUT` - Per-command timeout in seconds
/// - `NASFAN_LOG_CAPACITY` - Command log entries kept per session
/// - `NASFAN_LEGACY_FALLBACK` - `true` to enable legacy fallback commands
/// - `NASFAN_KNOWN_HOSTS` - known_hosts path; also turns on host key checking
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an environment
/// variable has an invalid value, or validation fails.
pub fn load_config(config_path: Option<&Path>) -> Result<NasfanConfig> {
    let mut config = NasfanConfig::default();

    if let Some(path) = config_path {
        config = load_config_file(path).context("Failed to load configuration file")?;
        tracing::info!(path = %path.display(), "Loaded configuration from file");
    } else {
        for path in default_config_paths() {
            if path.exists() {
                config = load_config_file(&path).context("Failed to load configuration file")?;
                tracing::info!(path = %path.display(), "Loaded configuration from file");
                break;
            }
        }
    }

    config = apply_env_overrides(config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Render the default configuration as a commented YAML document.
pub fn generate_config_template() -> String {
    let config = NasfanConfig::default();
    let mut yaml = String::new();

    yaml.push_str("# nasfan configuration file\n");
    yaml.push_str("#\n");
    yaml.push_str("# Precedence (highest to lowest):\n");
    yaml.push_str("# 1. Environment variables (NASFAN_* prefix)\n");
    yaml.push_str("# 2. This configuration file\n");
    yaml.push_str("# 3. Default values\n\n");

    yaml.push_str(&serde_yaml::to_string(&config).unwrap_or_default());

    yaml
}

fn load_config_file(path: &Path) -> Result<NasfanConfig> {
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;

    serde_yaml::from_str(&content).context(format!("Failed to parse {}", path.display()))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("./nasfan.yaml"),
        PathBuf::from("/etc/nasfan/config.yaml"),
    ];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("nasfan/config.yaml"));
    }

    paths
}

fn apply_env_overrides(mut config: NasfanConfig) -> Result<NasfanConfig> {
    if let Ok(value) = std::env::var("NASFAN_CONNECT_TIMEOUT") {
        config.ssh.connect_timeout = value
            .parse()
            .context(format!("Invalid NASFAN_CONNECT_TIMEOUT value: {value}"))?;
        tracing::debug!(
            timeout = config.ssh.connect_timeout,
            "Applied NASFAN_CONNECT_TIMEOUT override"
        );
    }

    if let Ok(value) = std::env::var("NASFAN_AUTH_TIMEOUT") {
        config.ssh.auth_timeout = value
            .parse()
            .context(format!("Invalid NASFAN_AUTH_TIMEOUT value: {value}"))?;
        tracing::debug!(
            timeout = config.ssh.auth_timeout,
            "Applied NASFAN_AUTH_TIMEOUT override"
        );
    }

    if let Ok(value) = std::env::var("NASFAN_COMMAND_TIMEOUT") {
        config.ssh.command_timeout = value
            .parse()
            .context(format!("Invalid NASFAN_COMMAND_TIMEOUT value: {value}"))?;
        tracing::debug!(
            timeout = config.ssh.command_timeout,
            "Applied NASFAN_COMMAND_TIMEOUT override"
        );
    }

    if let Ok(value) = std::env::var("NASFAN_LOG_CAPACITY") {
        config.log.capacity = value
            .parse()
            .context(format!("Invalid NASFAN_LOG_CAPACITY value: {value}"))?;
        tracing::debug!(
            capacity = config.log.capacity,
            "Applied NASFAN_LOG_CAPACITY override"
        );
    }

    if let Ok(value) = std::env::var("NASFAN_LEGACY_FALLBACK") {
        config.catalog.legacy_fallback = value
            .parse()
            .context(format!("Invalid NASFAN_LEGACY_FALLBACK value: {value}"))?;
        tracing::debug!(
            enabled = config.catalog.legacy_fallback,
            "Applied NASFAN_LEGACY_FALLBACK override"
        );
    }

    if let Ok(path) = std::env::var("NASFAN_KNOWN_HOSTS") {
        config.ssh.host_key_check = super::types::HostKeyCheck::KnownHosts;
        config.ssh.known_hosts_file = Some(PathBuf::from(&path));
        tracing::debug!(path = %path, "Applied NASFAN_KNOWN_HOSTS override");
    }

    Ok(config)
}

fn validate_config(config: &NasfanConfig) -> Result<()> {
    if config.ssh.connect_timeout == 0 {
        anyhow::bail!("ssh.connect_timeout must be greater than 0");
    }
    if config.ssh.auth_timeout == 0 {
        anyhow::bail!("ssh.auth_timeout must be greater than 0");
    }
    if config.ssh.command_timeout == 0 {
        anyhow::bail!("ssh.command_timeout must be greater than 0");
    }
    if config.log.capacity == 0 {
        anyhow::bail!("log.capacity must be greater than 0");
    }
    if let Some(path) = &config.ssh.known_hosts_file {
        if !path.exists() {
            anyhow::bail!("known_hosts file not found: {}", path.display());
        }
    }

    tracing::debug!("Configuration validation passed");
    Ok(())
}
