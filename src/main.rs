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

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use zeroize::Zeroizing;

use nasfan::{
    api::FanService,
    cli::{Cli, Commands},
    config::{generate_config_template, load_config, NasfanConfig},
    fan::Catalog,
    session::{LogEntryView, SessionRegistry},
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let succeeded = match &cli.command {
        Commands::GenConfig { output } => gen_config(output.clone())?,
        Commands::Speeds => list_speeds(cli.json)?,
        _ => run_remote(&cli).await?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Connect, run one remote subcommand and disconnect.
async fn run_remote(cli: &Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => load_config(Some(path))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config(None).unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {e:#}");
            NasfanConfig::default()
        }),
    };

    let host = cli
        .host
        .as_deref()
        .context("A NAS host is required (--host or NASFAN_HOST)")?;
    let user = cli
        .user
        .as_deref()
        .context("A username is required (--user or NASFAN_USER)")?;
    let password = read_password(user, host)?;

    let service = FanService::from_config(&config);
    let token = SessionRegistry::issue_token();

    let connected = service
        .connect(&token, host, user, password.as_str(), cli.port)
        .await;
    drop(password);

    let succeeded = if !connected.ok {
        emit(cli.json, &connected, &connected.message, false)?;
        false
    } else {
        if let Some(info) = &connected.connection_info {
            tracing::info!(
                host = %info.host,
                connected_at = %info.connected_at,
                "Connected"
            );
        }

        match &cli.command {
            Commands::Status => {
                let response = service.get_fan_status(&token).await;
                let line = if response.ok {
                    response.status.clone()
                } else {
                    response.message.clone()
                };
                emit(cli.json, &response, &line, response.ok)?
            }
            Commands::Set { speed } => {
                let response = service.set_fan_speed(&token, speed).await;
                emit(cli.json, &response, &response.message, response.ok)?
            }
            Commands::Detect => match &connected.detected_device {
                Some(device) => {
                    emit(cli.json, &connected, &format!("QM2 card: {device}"), true)?
                }
                None => emit(cli.json, &connected, "No QM2 device found", false)?,
            },
            Commands::Exec { command } => {
                let response = service.execute_command(&token, &command.join(" ")).await;
                if cli.json {
                    emit(true, &response, "", response.ok)?
                } else {
                    print_command_output(&response.stdout, &response.stderr, response.ok);
                    response.ok
                }
            }
            Commands::Speeds | Commands::GenConfig { .. } => true,
        }
    };

    if cli.show_log {
        let entries = service.get_log(&token).await;
        print_log(cli.json, &entries)?;
    }

    service.shutdown().await;
    Ok(succeeded)
}

/// Password from `NASFAN_PASSWORD`, else an interactive prompt.
fn read_password(user: &str, host: &str) -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var("NASFAN_PASSWORD") {
        tracing::debug!("Using password from NASFAN_PASSWORD");
        return Ok(Zeroizing::new(password));
    }

    let password = rpassword::prompt_password(format!("Password for {user}@{host}: "))
        .context("Failed to read password")?;
    Ok(Zeroizing::new(password))
}

/// Print either the JSON form of `response` or a colored status line.
fn emit<T: Serialize>(json: bool, response: &T, line: &str, ok: bool) -> Result<bool> {
    if json {
        let rendered =
            serde_json::to_string_pretty(response).context("Failed to serialize response")?;
        println!("{rendered}");
    } else if ok {
        println!("{} {}", "●".green(), line);
    } else {
        println!("{} {}", "●".red(), line.red());
    }
    Ok(ok)
}

fn print_command_output(stdout: &str, stderr: &str, ok: bool) {
    if !stdout.is_empty() {
        println!("{stdout}");
    }
    if !stderr.is_empty() {
        eprintln!("{}", stderr.red());
    }
    if !ok {
        eprintln!("{} {}", "●".red(), "Command failed".red());
    }
}

fn print_log(json: bool, entries: &[LogEntryView]) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(entries).context("Failed to serialize command log")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("\n{}", "Command log".bold());
    for entry in entries {
        let marker = if entry.success {
            format!("{}", "✓".green())
        } else {
            format!("{}", "✗".red())
        };
        println!("  [{}] {} {}", entry.timestamp.dimmed(), marker, entry.command);
        if let Some(error) = &entry.error_message {
            println!("      {}", error.red());
        } else if !entry.response.is_empty() {
            for line in entry.response.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }
    Ok(())
}

fn list_speeds(json: bool) -> Result<bool> {
    let options = Catalog::new().speed_options();

    if json {
        let rendered =
            serde_json::to_string_pretty(options).context("Failed to serialize speed options")?;
        println!("{rendered}");
    } else {
        for option in options {
            println!("  {:<8} {}", option.value.green(), option.label);
        }
    }
    Ok(true)
}

/// Generate a configuration file template
fn gen_config(output: Option<PathBuf>) -> Result<bool> {
    let template = generate_config_template();

    if let Some(path) = output {
        #[cfg(unix)]
        {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)
                .context("Failed to create configuration file")?;

            file.write_all(template.as_bytes())
                .context("Failed to write configuration file")?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&path, &template).context("Failed to write configuration file")?;
        }

        println!("Configuration template written to {}", path.display());
    } else {
        print!("{template}");
    }

    Ok(true)
}
