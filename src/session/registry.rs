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

//! Mapping from client session tokens to remote shell sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::remote::{RemoteShellSession, SessionSettings};
use crate::ssh::Connector;

/// A session shared between concurrent requests bearing the same token.
///
/// The mutex serializes connect, disconnect and command execution on the
/// underlying channel.
pub type SharedSession = Arc<Mutex<RemoteShellSession>>;

/// Owns every client's [`RemoteShellSession`].
///
/// Created once at process start and handed to the request layer;
/// [`shutdown`](Self::shutdown) closes all channels.
pub struct SessionRegistry {
    connector: Arc<dyn Connector>,
    settings: SessionSettings,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>, settings: SessionSettings) -> Self {
        Self {
            connector,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh token for a client that has none.
    pub fn issue_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// The session for `token`, creating a disconnected one on first use.
    pub async fn resolve(&self, token: &str) -> SharedSession {
        if let Some(session) = self.sessions.read().await.get(token) {
            return Arc::clone(session);
        }

        // Re-check under the write lock: another request with the same
        // token may have inserted between the two lock acquisitions.
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(token.to_string()).or_insert_with(|| {
            tracing::debug!("Creating remote shell session for new client");
            Arc::new(Mutex::new(RemoteShellSession::new(
                Arc::clone(&self.connector),
                self.settings,
            )))
        });
        Arc::clone(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Disconnect every session and forget all tokens.
    pub async fn shutdown(&self) {
        let sessions: Vec<SharedSession> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        tracing::info!(count = sessions.len(), "Closing remote shell sessions");
        for session in sessions {
            session.lock().await.disconnect().await;
        }
    }
}
