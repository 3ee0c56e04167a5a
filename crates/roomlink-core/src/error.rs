//! Shared error type across roomlink crates.

use thiserror::Error;

/// How a failure affects the current room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged and survived: the state machine stays where it is and the
    /// next valid event resumes progress.
    Recoverable,
    /// Aborts the join / tears the call down.
    Fatal,
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RoomLinkError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum RoomLinkError {
    /// Relay unreachable, socket error, unexpected close.
    #[error("transport: {0}")]
    Transport(String),
    /// Malformed JSON, unknown `type`, missing required field.
    #[error("envelope: {0}")]
    Envelope(String),
    /// Description or candidate rejected by the negotiation collaborator.
    #[error("negotiation: {0}")]
    Negotiation(String),
    /// Local media acquisition failed (permission denied, no device).
    #[error("media: {0}")]
    Media(String),
    /// Render collaborator refused a surface operation.
    #[error("render: {0}")]
    Render(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RoomLinkError {
    /// Map the error to its effect on the active call.
    pub fn severity(&self) -> Severity {
        match self {
            RoomLinkError::Transport(_)
            | RoomLinkError::Envelope(_)
            | RoomLinkError::Negotiation(_)
            | RoomLinkError::Render(_) => Severity::Recoverable,
            RoomLinkError::Media(_)
            | RoomLinkError::Config(_)
            | RoomLinkError::Internal(_) => Severity::Fatal,
        }
    }
}
