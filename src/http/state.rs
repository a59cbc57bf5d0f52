use super::ws::ConnectionRegistry;
use crate::audio::Transcoder;
use crate::recognition::Recognizer;
use crate::session::{SessionConfig, SessionContext, SessionStore};
use std::sync::Arc;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// Active voice sessions (connection id → session)
    pub sessions: Arc<SessionStore>,

    /// Connected sockets; the sessions' event transport
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(
        config: SessionConfig,
        transcoder: Arc<dyn Transcoder>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        let connections = Arc::new(ConnectionRegistry::new());
        let ctx = SessionContext::new(config, transcoder, recognizer, connections.clone());

        Self {
            sessions: Arc::new(SessionStore::new(ctx)),
            connections,
        }
    }
}
