//! Capability interfaces supplied by the embedder.
//!
//! The core never touches media, ICE, or the screen directly: it calls
//! through these narrow traits. Session descriptions and network candidates
//! stay opaque `serde_json::Value` blobs end to end; the engine routes them
//! between the wire and the negotiation collaborator without inspecting
//! their contents.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use roomlink_core::Result;

/// Kind of a media track / render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
}

/// Handle to an acquired local media stream.
#[derive(Debug, Clone)]
pub struct LocalMedia {
    pub id: String,
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, Copy)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

#[derive(Debug, Clone)]
pub struct IceServer {
    pub urls: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
}

/// Callback-style notifications from the negotiation collaborator,
/// delivered over a per-session channel. Dropping the receiver discards a
/// stale session's notifications.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TrackAdded {
        stream_id: String,
        track_id: String,
        kind: TrackKind,
    },
    StreamClosed {
        stream_id: String,
    },
    LocalCandidate(Value),
}

/// Local capture devices.
#[async_trait]
pub trait MediaCapability: Send + Sync {
    async fn acquire_local_media(&self, constraints: MediaConstraints) -> Result<LocalMedia>;
    fn stop_tracks(&self, media: &LocalMedia);
}

/// Factory for negotiation sessions.
#[async_trait]
pub trait NegotiationCapability: Send + Sync {
    async fn create_session(
        &self,
        ice: &IceConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn NegotiationSession>>;
}

/// One offer/answer/candidate exchange context. Mutated only by the
/// negotiation engine.
#[async_trait]
pub trait NegotiationSession: Send + Sync {
    async fn set_remote_description(&self, desc: Value) -> Result<()>;
    async fn create_offer(&self) -> Result<Value>;
    async fn create_answer(&self) -> Result<Value>;
    async fn set_local_description(&self, desc: Value) -> Result<()>;
    async fn add_candidate(&self, candidate: Value) -> Result<()>;
    async fn add_local_media(&self, media: &LocalMedia) -> Result<()>;
    fn close(&self);
}

/// UI collaborator: surfaces, chat lines, alerts, link indicator.
pub trait RenderCapability: Send + Sync {
    fn attach_surface(&self, participant: &str, kind: TrackKind);
    fn detach_surface(&self, participant: &str, kind: TrackKind);
    fn append_chat_line(&self, line: &str);
    fn show_alert(&self, message: &str);
    /// Reconnect indicator: `false` while the relay link is down.
    fn set_link_indicator(&self, up: bool);
}

/// Bundle of collaborators handed to [`crate::RoomCall::join`].
#[derive(Clone)]
pub struct Capabilities {
    pub media: Arc<dyn MediaCapability>,
    pub negotiation: Arc<dyn NegotiationCapability>,
    pub render: Arc<dyn RenderCapability>,
}
