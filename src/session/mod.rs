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

//! Per-client remote shell sessions and their command logs.

pub mod command_log;
pub mod connection;
pub mod registry;
pub mod remote;

pub use command_log::{CommandLog, LogEntry, LogEntryView, DEFAULT_LOG_CAPACITY};
pub use connection::{Connection, ConnectionInfo};
pub use registry::{SessionRegistry, SharedSession};
pub use remote::{CommandOutput, RemoteShellSession, SessionSettings, VERIFY_COMMAND};
