use super::events::ConnectionId;
use super::session::{self, SessionContext, SessionHandle, SessionTasks};
use super::state::Mode;
use super::stats::SessionSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

struct SessionEntry {
    handle: SessionHandle,
    tasks: SessionTasks,
}

/// Registry of live voice sessions, one per connection
pub struct SessionStore {
    ctx: Arc<SessionContext>,
    sessions: RwLock<HashMap<ConnectionId, SessionEntry>>,
}

impl SessionStore {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub async fn get(&self, id: &ConnectionId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.handle.clone())
    }

    /// Return the session for `id`, creating it if needed
    pub async fn create_if_absent(&self, id: &ConnectionId) -> SessionHandle {
        if let Some(handle) = self.get(id).await {
            return handle;
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            return entry.handle.clone();
        }

        let (handle, tasks) = session::spawn(id.clone(), Arc::clone(&self.ctx));
        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                tasks,
            },
        );
        info!("Created speech session for {}", id);

        handle
    }

    /// Destroy the session for `id`. Once this returns the session emits
    /// nothing more and none of its deadlines can fire.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(id)
        };

        match entry {
            Some(entry) => {
                entry.tasks.shutdown().await;
                info!("Destroyed speech session for {}", id);
                true
            }
            None => false,
        }
    }

    /// Destroy every session
    pub async fn shutdown(&self) {
        let entries: Vec<(ConnectionId, SessionEntry)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        for (id, entry) in entries {
            entry.tasks.shutdown().await;
            debug!("Destroyed speech session for {} on shutdown", id);
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of all live sessions, sorted
    pub async fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn snapshot(&self, id: &ConnectionId) -> Option<SessionSnapshot> {
        self.get(id).await?.snapshot().await
    }

    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let handles: Vec<SessionHandle> = {
            let sessions = self.sessions.read().await;
            sessions.values().map(|entry| entry.handle.clone()).collect()
        };

        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(snapshot) = handle.snapshot().await {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        snapshots
    }

    // Inbound client events. Only `start_listening` creates a session; the
    // others report whether a session existed.

    pub async fn start_listening(
        &self,
        id: &ConnectionId,
        mode: Mode,
        initial_text: impl Into<String>,
    ) {
        self.create_if_absent(id)
            .await
            .start_listening(mode, initial_text);
    }

    pub async fn stop_listening(&self, id: &ConnectionId) -> bool {
        self.with_session(id, "stop_listening", |s| s.stop_listening())
            .await
    }

    pub async fn audio_chunk(&self, id: &ConnectionId, bytes: Vec<u8>) -> bool {
        self.with_session(id, "audio_chunk", |s| s.push_audio(bytes))
            .await
    }

    pub async fn set_mode(&self, id: &ConnectionId, mode: Mode) -> bool {
        self.with_session(id, "set_mode", |s| s.set_mode(mode)).await
    }

    pub async fn manual_wake(&self, id: &ConnectionId) -> bool {
        self.with_session(id, "manual_wake", |s| s.manual_wake())
            .await
    }

    pub async fn manual_sleep(&self, id: &ConnectionId) -> bool {
        self.with_session(id, "manual_sleep", |s| s.manual_sleep())
            .await
    }

    pub async fn reset_transcript(&self, id: &ConnectionId) -> bool {
        self.with_session(id, "reset_transcript", |s| s.reset_transcript())
            .await
    }

    async fn with_session(
        &self,
        id: &ConnectionId,
        action: &str,
        f: impl FnOnce(&SessionHandle) -> bool,
    ) -> bool {
        match self.get(id).await {
            Some(handle) => f(&handle),
            None => {
                debug!("Ignoring {} for {}: no session", action, id);
                false
            }
        }
    }
}
