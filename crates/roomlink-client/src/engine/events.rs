//! Events crossing the engine's boundaries.

use roomlink_core::protocol::chat::ChatMessage;
use roomlink_core::Result;

use crate::caps::{LocalMedia, TrackKind};

/// Engine -> session view. Delivered over an unbounded FIFO so arrival
/// order is preserved.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    TrackAdded { participant: String, kind: TrackKind },
    TrackRemoved { participant: String },
    Chat(ChatMessage),
}

/// User -> call driver.
#[derive(Debug)]
pub enum Command {
    SendChat(String),
    Leave,
}

/// Results of spawned work, tagged with the session generation so late
/// arrivals from a discarded session are detected and ignored.
#[derive(Debug)]
pub(crate) enum DriverEvent {
    MediaReady {
        generation: u64,
        result: Result<LocalMedia>,
    },
}
