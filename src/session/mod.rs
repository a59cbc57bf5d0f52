//! Voice session management
//!
//! This module provides the per-connection voice session:
//! - Listening state machine (dictation / command, asleep / awake)
//! - Audio accumulation into fixed windows and ordered flushing
//! - Wake-phrase gating and inactivity timers for command mode
//! - The store that creates and destroys sessions per connection

mod config;
mod events;
mod session;
mod state;
mod stats;
mod store;
pub mod timers;

pub use config::SessionConfig;
pub use events::{ConnectionId, SessionEvent, Transport};
pub use session::{SessionContext, SessionHandle};
pub use state::{Mode, VoiceState};
pub use stats::SessionSnapshot;
pub use store::SessionStore;
pub use timers::{Deadlines, TimerKind};
