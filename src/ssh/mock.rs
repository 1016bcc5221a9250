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

//! Scripted in-memory host for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::tokio_client::{CommandExecutedResult, Error};
use super::{ConnectTarget, Connector, RemoteTransport};

/// How the scripted host answers a command.
#[derive(Debug, Clone)]
pub enum Reply {
    Exit {
        status: u32,
        stdout: String,
        stderr: String,
    },
    /// Channel dies before an exit status arrives.
    Fault,
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn exit(status: u32, stdout: &str, stderr: &str) -> Self {
        Reply::Exit {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    pub fn ok(stdout: &str) -> Self {
        Reply::exit(0, stdout, "")
    }
}

#[derive(Default)]
struct HostState {
    rules: Mutex<Vec<(String, Reply)>>,
    executed: Mutex<Vec<String>>,
    alive: AtomicBool,
    closed: AtomicUsize,
    fail_close: AtomicBool,
    connect_error: Mutex<Option<fn() -> Error>>,
}

/// A fake NAS. Commands with no matching rule exit 0 with empty output;
/// the most recently added rule whose pattern is contained in the command wins.
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<HostState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, pattern: &str, reply: Reply) {
        self.state
            .rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), reply));
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn fail_connect_with(&self, make_error: fn() -> Error) {
        *self.state.connect_error.lock().unwrap() = Some(make_error);
    }

    pub fn fail_close(&self) {
        self.state.fail_close.store(true, Ordering::SeqCst);
    }

    /// Simulate the peer vanishing without a close.
    pub fn drop_link(&self) {
        self.state.alive.store(false, Ordering::SeqCst);
    }

    fn reply_for(&self, command: &str) -> Reply {
        self.state
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Reply::ok(""))
    }
}

#[async_trait]
impl Connector for MockHost {
    async fn open(
        &self,
        _target: &ConnectTarget,
        _secret: Zeroizing<String>,
    ) -> Result<Box<dyn RemoteTransport>, Error> {
        if let Some(make_error) = *self.state.connect_error.lock().unwrap() {
            return Err(make_error());
        }
        self.state.alive.store(true, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl RemoteTransport for MockHost {
    async fn exec(&self, command: &str) -> Result<CommandExecutedResult, Error> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push(command.to_string());
        match self.reply_for(command) {
            Reply::Exit {
                status,
                stdout,
                stderr,
            } => Ok(CommandExecutedResult {
                stdout,
                stderr,
                exit_status: status,
            }),
            Reply::Fault => Err(Error::CommandDidntExit),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn is_active(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), Error> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        self.state.alive.store(false, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }
}
