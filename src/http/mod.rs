//! HTTP and WebSocket server for voice clients
//!
//! - GET /ws - WebSocket carrying client and session events
//! - GET /sessions - List live sessions
//! - GET /sessions/:id - Snapshot of one session
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use handlers::{ErrorResponse, SessionListResponse, SNAPSHOT_TIMEOUT};
pub use routes::create_router;
pub use state::AppState;
pub use ws::{decode_audio, dispatch, ClientEvent, ConnectionRegistry};
