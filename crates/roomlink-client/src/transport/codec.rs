//! Frame decoding at the transport boundary.
//!
//! Malformed frames are reported as errors here and dropped by the channel
//! pump; the envelope consumer is never invoked for them.

use roomlink_core::protocol::envelope::Envelope;
use roomlink_core::Result;

pub fn decode(frame: &str) -> Result<Envelope> {
    Envelope::parse(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomlink_core::protocol::envelope::EventKind;
    use roomlink_core::RoomLinkError;

    #[test]
    fn decodes_candidate_frame() {
        let env = decode(r#"{"type":"candidate","payload":{"candidate":"candidate:0"}}"#)
            .expect("must parse");
        assert_eq!(env.kind, EventKind::Candidate);
    }

    #[test]
    fn malformed_json_is_an_envelope_error() {
        let err = decode("{not json").expect_err("must fail");
        assert!(matches!(err, RoomLinkError::Envelope(_)));
    }

    #[test]
    fn unknown_type_is_an_envelope_error() {
        let err = decode(r#"{"type":"join_room","payload":{}}"#).expect_err("must fail");
        assert!(matches!(err, RoomLinkError::Envelope(_)));
    }
}
