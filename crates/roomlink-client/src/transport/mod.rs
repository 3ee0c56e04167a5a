//! Signaling transport (WebSocket client).

pub mod channel;
pub mod codec;

pub use channel::{Channel, ConnectionState, Sender};
