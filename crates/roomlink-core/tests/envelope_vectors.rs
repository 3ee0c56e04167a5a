//! Envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use roomlink_core::protocol::chat::ReceiveMessagePayload;
use roomlink_core::protocol::envelope::{Envelope, EventKind, OutgoingEnvelope};
use roomlink_core::RoomLinkError;

fn load(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn parse_offer() {
    let env = Envelope::parse(&load("envelope_offer.json")).unwrap();
    assert_eq!(env.kind, EventKind::Offer);
    let desc = env.payload_value().unwrap();
    assert!(desc.get("sdp").is_some());
}

#[test]
fn parse_candidate() {
    let env = Envelope::parse(&load("envelope_candidate.json")).unwrap();
    assert_eq!(env.kind, EventKind::Candidate);
    let cand = env.payload_value().unwrap();
    assert_eq!(cand["sdpMLineIndex"], 0);
}

#[test]
fn parse_receive_message() {
    let env = Envelope::parse(&load("envelope_receive_message.json")).unwrap();
    assert_eq!(env.kind, EventKind::ReceiveMessage);
    let msg: ReceiveMessagePayload = env.payload_as().unwrap();
    assert_eq!(msg.message, "hello");
    assert_eq!(msg.from, "user1");
    assert_eq!(msg.sent, "2024-03-11T09:30:00Z");
}

#[test]
fn reject_unknown_type() {
    let err = Envelope::parse(&load("envelope_unknown_type.json")).expect_err("must fail");
    assert!(matches!(err, RoomLinkError::Envelope(_)));
}

#[test]
fn reject_missing_type() {
    let err = Envelope::parse(&load("envelope_missing_type.json")).expect_err("must fail");
    assert!(matches!(err, RoomLinkError::Envelope(_)));
}

#[test]
fn parse_envelope_without_payload() {
    // change_room is reserved: parses fine, payload access reports the gap.
    let env = Envelope::parse(&load("envelope_no_payload.json")).unwrap();
    assert_eq!(env.kind, EventKind::ChangeRoom);
    assert!(env.payload.is_none());
    assert!(env.payload_value().is_err());
}

#[test]
fn reject_truncated_frame() {
    let err = Envelope::parse("{ \"type\": \"offer\", \"payl").expect_err("must fail");
    assert!(matches!(err, RoomLinkError::Envelope(_)));
}

#[test]
fn outgoing_roundtrips_through_inbound() {
    let out = OutgoingEnvelope::new(
        EventKind::SendMessage,
        serde_json::json!({ "message": "hi", "from": "user1" }),
    );
    let frame = out.encode().unwrap();
    let back = Envelope::parse(&frame).unwrap();
    assert_eq!(back.kind, EventKind::SendMessage);
}
