//! Negotiation engine: envelope consumer and session-state machine.

pub mod call;
pub mod events;
pub mod negotiation;

pub use events::EngineEvent;
pub use negotiation::{EngineState, NegotiationEngine};
