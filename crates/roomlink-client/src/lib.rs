//! roomlink client library.
//!
//! This crate wires the transport channel, negotiation engine, and session
//! view into a room-call client. The relay is used for signaling only; the
//! actual media, ICE transport, and rendering are supplied by the embedder
//! through the capability traits in [`caps`].
//!
//! Layering (leaves first):
//! - [`transport`] owns the signaling connection and its reconnect policy.
//! - [`engine`] consumes inbound envelopes and drives the negotiation
//!   session collaborator through its states.
//! - [`view`] projects engine events onto render surfaces and the chat log.

pub mod caps;
pub mod config;
pub mod engine;
pub mod transport;
pub mod view;

pub use caps::Capabilities;
pub use config::ClientConfig;
pub use engine::call::RoomCall;
pub use engine::events::EngineEvent;
pub use engine::negotiation::EngineState;
pub use transport::channel::ConnectionState;
pub use view::SessionView;
