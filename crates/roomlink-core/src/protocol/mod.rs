//! Signaling protocol types.
//!
//! The relay speaks a single JSON envelope format over a persistent ordered
//! connection. Parsers here are panic-free: malformed input is reported as
//! `RoomLinkError` instead of panicking, keeping the client resilient to a
//! misbehaving relay.

pub mod envelope;
pub mod chat;
