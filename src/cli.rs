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

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Remote fan-speed control for QNAP QM2 expansion cards
#[derive(Parser, Debug)]
#[command(name = "nasfan")]
#[command(version)]
#[command(
    about = "Remote fan-speed control for QNAP QM2 expansion cards over SSH",
    long_about = None,
    after_help = "EXAMPLES:\n  List speed presets:   nasfan speeds\n  Show fan status:      nasfan -H 192.168.1.10 -u admin status\n  Set fan speed:        nasfan -H nas.local -u admin set medium\n  Run a raw command:    nasfan -H nas.local -u admin --show-log exec 'hal_app --se_enum'\n\nThe password is read from NASFAN_PASSWORD or prompted for."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// NAS hostname or IP address
    #[arg(
        short = 'H',
        long,
        global = true,
        env = "NASFAN_HOST",
        value_parser = parse_host,
        value_name = "HOST"
    )]
    pub host: Option<String>,

    /// SSH username
    #[arg(short, long, global = true, env = "NASFAN_USER", value_name = "USER")]
    pub user: Option<String>,

    /// SSH port
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 22,
        value_parser = clap::value_parser!(u16).range(1..),
        value_name = "PORT"
    )]
    pub port: u16,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the session command log before exiting
    #[arg(long, global = true)]
    pub show_log: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the available fan speed presets
    Speeds,

    /// Show the current fan status
    Status,

    /// Set the fan speed to a preset (auto, silent, low, medium, high, max)
    Set {
        /// Preset value
        speed: String,
    },

    /// Detect the QM2 expansion card identifier
    Detect,

    /// Execute an arbitrary command on the NAS
    Exec {
        /// Command line, passed to the remote shell as-is
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Generate a configuration file template
    GenConfig {
        /// Output path (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Whether the subcommand talks to the NAS.
    pub fn needs_connection(&self) -> bool {
        !matches!(self, Commands::Speeds | Commands::GenConfig { .. })
    }
}

/// Accept a hostname, IPv4 address or bracketed IPv6 address.
fn parse_host(host: &str) -> Result<String, String> {
    const MAX_HOSTNAME_LENGTH: usize = 253;

    if host.trim().is_empty() {
        return Err("empty hostname".to_string());
    }
    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(format!(
            "hostname too long: {} bytes (max: {MAX_HOSTNAME_LENGTH})",
            host.len()
        ));
    }

    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return match inner.parse::<std::net::Ipv6Addr>() {
            Ok(_) => Ok(inner.to_string()),
            Err(_) => Err(format!("invalid IPv6 address: {host}")),
        };
    }
    if host.parse::<std::net::IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
    if !host.chars().all(valid_chars) {
        return Err(format!("invalid characters in hostname: {host}"));
    }
    if host.split('.').any(|label| {
        label.is_empty() || label.starts_with('-') || label.ends_with('-')
    }) {
        return Err(format!("malformed hostname: {host}"));
    }

    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_command() {
        let cli = Cli::try_parse_from(["nasfan", "-H", "nas.local", "-u", "admin", "set", "medium"])
            .unwrap();
        assert_eq!(cli.host.as_deref(), Some("nas.local"));
        assert_eq!(cli.user.as_deref(), Some("admin"));
        assert_eq!(cli.port, 22);
        assert_eq!(
            cli.command,
            Commands::Set {
                speed: "medium".to_string()
            }
        );
        assert!(cli.command.needs_connection());
    }

    #[test]
    fn test_parse_exec_joins_trailing_args() {
        let cli = Cli::try_parse_from([
            "nasfan", "-H", "nas", "-u", "admin", "exec", "hal_app", "--se_enum",
        ])
        .unwrap();
        match cli.command {
            Commands::Exec { command } => assert_eq!(command.join(" "), "hal_app --se_enum"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_port_zero_rejected() {
        assert!(Cli::try_parse_from(["nasfan", "--port", "0", "status"]).is_err());
        assert!(Cli::try_parse_from(["nasfan", "--port", "65536", "status"]).is_err());
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("nas.local").unwrap(), "nas.local");
        assert_eq!(parse_host("192.168.1.10").unwrap(), "192.168.1.10");
        assert_eq!(parse_host("fe80::1").unwrap(), "fe80::1");
        assert_eq!(parse_host("[fe80::1]").unwrap(), "fe80::1");

        assert!(parse_host("").is_err());
        assert!(parse_host("nas;reboot").is_err());
        assert!(parse_host("nas..local").is_err());
        assert!(parse_host("-nas.local").is_err());
        assert!(parse_host("[not-v6]").is_err());
    }

    #[test]
    fn test_invalid_host_rejected_at_parse() {
        assert!(Cli::try_parse_from(["nasfan", "-H", "nas local", "status"]).is_err());
    }

    #[test]
    fn test_local_commands_need_no_connection() {
        let cli = Cli::try_parse_from(["nasfan", "speeds"]).unwrap();
        assert!(!cli.command.needs_connection());
        let cli = Cli::try_parse_from(["nasfan", "gen-config"]).unwrap();
        assert!(!cli.command.needs_connection());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["nasfan", "status", "--json", "--show-log", "-vv"]).unwrap();
        assert!(cli.json);
        assert!(cli.show_log);
        assert_eq!(cli.verbose, 2);
    }
}
