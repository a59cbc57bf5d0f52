//! WebSocket bridge between browser clients and voice sessions
//!
//! Frames are JSON `{"event": <name>, "data": {...}}` in both directions.
//! Binary frames carry raw audio chunks.

use super::state::AppState;
use crate::session::{ConnectionId, Mode, SessionEvent, SessionStore, Transport};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    StartSpeech {
        #[serde(default)]
        mode: Mode,
        /// Client-side transcript, seeds dictation
        #[serde(default)]
        current_text: String,
    },
    StopSpeech,
    AudioChunk {
        /// Base64 audio, optionally as a `data:` URL
        audio: String,
    },
    VoiceModeChanged {
        mode: Mode,
    },
    ManualWake,
    ManualSleep,
    ResetTranscript,
}

/// Decode a base64 audio payload, accepting `data:<mime>;base64,` URLs
pub fn decode_audio(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let data = match payload.split_once(";base64,") {
        Some((_, data)) if payload.starts_with("data:") => data,
        _ => payload,
    };
    base64::engine::general_purpose::STANDARD.decode(data.trim())
}

/// Route a client event to its session
pub async fn dispatch(sessions: &SessionStore, id: &ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::StartSpeech { mode, current_text } => {
            info!(
                "Starting speech recognition for {} in {} mode with text: '{}'",
                id, mode, current_text
            );
            sessions.start_listening(id, mode, current_text).await;
        }
        ClientEvent::StopSpeech => {
            info!("Stopping speech recognition for {}", id);
            sessions.stop_listening(id).await;
        }
        ClientEvent::AudioChunk { audio } => match decode_audio(&audio) {
            Ok(bytes) => {
                sessions.audio_chunk(id, bytes).await;
            }
            Err(e) => warn!("Dropping undecodable audio chunk from {}: {}", id, e),
        },
        ClientEvent::VoiceModeChanged { mode } => {
            info!("Voice mode for {} changed to: {}", id, mode);
            sessions.set_mode(id, mode).await;
        }
        ClientEvent::ManualWake => {
            info!("Manual wake triggered by {}", id);
            sessions.manual_wake(id).await;
        }
        ClientEvent::ManualSleep => {
            info!("Manual sleep triggered by {}", id);
            sessions.manual_sleep(id).await;
        }
        ClientEvent::ResetTranscript => {
            sessions.reset_transcript(id).await;
        }
    }
}

/// Outbound event channels of connected sockets
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<SessionEvent>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiving end of its events
    pub fn register(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        rx
    }

    pub fn unregister(&self, id: &ConnectionId) -> bool {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for ConnectionRegistry {
    fn emit(&self, connection: &ConnectionId, event: SessionEvent) {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        match senders.get(connection) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Connection {} is closing, event dropped", connection);
                }
            }
            None => debug!(
                "No connection {} for event {}",
                connection,
                event.name()
            ),
        }
    }
}

/// GET /ws
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ConnectionId::generate();
    let (mut sender, mut receiver) = socket.split();

    let mut outbound = state.connections.register(id.clone());
    state.sessions.create_if_absent(&id).await;
    info!("Client connected: {}", id);

    let writer_id = id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {} for {}: {}", event.name(), writer_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!("WebSocket error for {}: {}", id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => dispatch(&state.sessions, &id, event).await,
                Err(e) => warn!("Ignoring malformed event from {}: {}", id, e),
            },
            Message::Binary(bytes) => {
                state.sessions.audio_chunk(&id, bytes).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    state.sessions.remove(&id).await;
    state.connections.unregister(&id);
    let _ = writer.await;
    info!("Client disconnected: {}", id);
}
