//! Top-level facade crate for roomlink.
//!
//! Re-exports the wire contracts and the client stack so embedders can
//! depend on a single crate.

pub mod core {
    pub use roomlink_core::*;
}

pub mod client {
    pub use roomlink_client::*;
}
