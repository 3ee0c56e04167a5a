//! Chat payload shapes.

use serde::{Deserialize, Serialize};

/// `send_message` payload (client -> relay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub message: String,
    pub from: String,
}

/// `receive_message` payload (relay -> client).
///
/// `sent` is the relay-stamped RFC3339 timestamp. Display ordering is
/// arrival order, never `sent` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveMessagePayload {
    pub message: String,
    pub from: String,
    pub sent: String,
}

/// A chat line as the client renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub from: String,
    pub body: String,
    pub sent_at: String,
}

impl From<ReceiveMessagePayload> for ChatMessage {
    fn from(p: ReceiveMessagePayload) -> Self {
        Self {
            from: p.from,
            body: p.message,
            sent_at: p.sent,
        }
    }
}
