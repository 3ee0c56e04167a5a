//! Signaling envelope (JSON).
//!
//! Inbound payloads are stored as `RawValue` to enable lazy parsing: the
//! engine only deserializes the payload shape it actually dispatches on.
//! Rule: inbound is consumed (no Clone). Outbound is produced.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Result, RoomLinkError};

/// Closed enumeration of envelope kinds.
///
/// Unknown kinds fail deserialization of the whole envelope, so they are
/// rejected at the codec boundary and never reach the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Offer,
    Answer,
    Candidate,
    SendMessage,
    ReceiveMessage,
    /// Reserved by the protocol; the engine logs and ignores it.
    ChangeRoom,
}

impl EventKind {
    /// Wire name, for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Offer => "offer",
            EventKind::Answer => "answer",
            EventKind::Candidate => "candidate",
            EventKind::SendMessage => "send_message",
            EventKind::ReceiveMessage => "receive_message",
            EventKind::ChangeRoom => "change_room",
        }
    }
}

/// Inbound envelope: lazy payload parsing (RawValue).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Envelope kind (field name is `type` on the wire).
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Kind-specific payload, stored as raw JSON.
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

impl Envelope {
    /// Parse one wire frame into an envelope.
    pub fn parse(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|e| RoomLinkError::Envelope(format!("invalid envelope json: {e}")))
    }

    /// Deserialize the payload into a concrete shape.
    pub fn payload_as<'a, T: Deserialize<'a>>(&'a self) -> Result<T> {
        let raw = self.payload.as_ref().ok_or_else(|| {
            RoomLinkError::Envelope(format!("{} requires payload", self.kind.as_str()))
        })?;
        serde_json::from_str(raw.get()).map_err(|e| {
            RoomLinkError::Envelope(format!("{} invalid payload: {e}", self.kind.as_str()))
        })
    }

    /// Payload as an opaque JSON value (offer/answer/candidate blobs).
    pub fn payload_value(&self) -> Result<serde_json::Value> {
        self.payload_as()
    }
}

/// Outbound envelope, produced by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl OutgoingEnvelope {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }

    /// Serialize to a wire frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RoomLinkError::Envelope(format!("envelope encode failed: {e}")))
    }
}
