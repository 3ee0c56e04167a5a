//! roomlink core: wire-level signaling contracts and error types.
//!
//! This crate defines the envelope format exchanged with the relay and the
//! error surface shared by the transport, engine, and view layers. It
//! intentionally carries no transport or runtime dependencies so it can be
//! reused by relay-side tooling as well as the client.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RoomLinkError`/`Result` so a
//! malformed relay frame can never take the client process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, RoomLinkError};
