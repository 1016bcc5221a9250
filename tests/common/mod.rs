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

//! Scripted NAS used by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nasfan::api::FanService;
use nasfan::fan::Catalog;
use nasfan::session::SessionSettings;
use nasfan::ssh::tokio_client::{CommandExecutedResult, Error};
use nasfan::ssh::{ConnectTarget, Connector, RemoteTransport};
use zeroize::Zeroizing;

pub const DEVICE: &str = "qm2_1_11.32";

pub const ENUM_OUTPUT: &str = "\
Enclosure_ID  Model_Name  Enc_Sys_ID    Slots
0             TS-h973AX   root          5
1             QM2-2P      qm2_1_11.32   2
";

#[derive(Default)]
struct State {
    /// (pattern, exit status, stdout, stderr); last match wins
    rules: Mutex<Vec<(String, u32, String, String)>>,
    executed: Mutex<Vec<String>>,
    alive: AtomicBool,
    reject_password: AtomicBool,
}

/// Fake NAS answering commands from substring rules.
/// Unmatched commands exit 0 with empty output.
#[derive(Clone, Default)]
pub struct ScriptedNas {
    state: Arc<State>,
}

impl ScriptedNas {
    pub fn new() -> Self {
        Self::default()
    }

    /// A NAS with one QM2 card and healthy fan reads.
    pub fn with_qm2_card() -> Self {
        let nas = Self::new();
        nas.reply("--se_enum", 0, ENUM_OUTPUT, "");
        nas.reply("--se_sys_get_fan_status", 0, "OK\n", "");
        nas.reply("--se_sys_get_fan_pwm", 0, "100\n", "");
        nas
    }

    pub fn reply(&self, pattern: &str, status: u32, stdout: &str, stderr: &str) {
        self.state.rules.lock().unwrap().push((
            pattern.to_string(),
            status,
            stdout.to_string(),
            stderr.to_string(),
        ));
    }

    pub fn reject_password(&self) {
        self.state.reject_password.store(true, Ordering::SeqCst);
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    pub fn clear_executed(&self) {
        self.state.executed.lock().unwrap().clear();
    }

    pub fn service(&self) -> FanService {
        self.service_with(SessionSettings::default())
    }

    pub fn service_with(&self, settings: SessionSettings) -> FanService {
        FanService::new(Arc::new(self.clone()), settings, Catalog::new())
    }

    pub fn legacy_service(&self) -> FanService {
        FanService::new(
            Arc::new(self.clone()),
            SessionSettings::default(),
            Catalog::new().with_legacy_fallback(true),
        )
    }
}

#[async_trait]
impl Connector for ScriptedNas {
    async fn open(
        &self,
        _target: &ConnectTarget,
        _secret: Zeroizing<String>,
    ) -> Result<Box<dyn RemoteTransport>, Error> {
        if self.state.reject_password.load(Ordering::SeqCst) {
            return Err(Error::PasswordWrong);
        }
        self.state.alive.store(true, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl RemoteTransport for ScriptedNas {
    async fn exec(&self, command: &str) -> Result<CommandExecutedResult, Error> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push(command.to_string());

        let rules = self.state.rules.lock().unwrap();
        let (exit_status, stdout, stderr) = rules
            .iter()
            .rev()
            .find(|(pattern, ..)| command.contains(pattern.as_str()))
            .map(|(_, status, stdout, stderr)| (*status, stdout.clone(), stderr.clone()))
            .unwrap_or((0, String::new(), String::new()));

        Ok(CommandExecutedResult {
            stdout,
            stderr,
            exit_status,
        })
    }

    fn is_active(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), Error> {
        self.state.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}
