//! The negotiation state machine.
//!
//! One engine drives exactly one negotiation session per room membership,
//! translating between the envelope wire format and the collaborator's
//! async operations. All handlers run on the call driver's single select
//! loop, so interleavings are serialized; the one race tolerated explicitly
//! is a `candidate` envelope arriving before the session exists, which is
//! queued and flushed on session creation.
//!
//! Error discipline: a failing offer/answer/candidate operation is logged
//! and leaves the state machine where it is. Negotiation stalls instead of
//! crashing, and the next valid envelope resumes progress.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use roomlink_core::protocol::chat::{ReceiveMessagePayload, SendMessagePayload};
use roomlink_core::protocol::envelope::{Envelope, EventKind, OutgoingEnvelope};
use roomlink_core::{Result, RoomLinkError};

use crate::caps::{
    Capabilities, IceConfig, LocalMedia, MediaConstraints, NegotiationSession, SessionEvent,
};
use crate::engine::events::{DriverEvent, EngineEvent};
use crate::transport::Sender;

/// Per-room-membership negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingLocalMedia,
    Offering,
    Negotiating,
    Established,
    Closed,
}

pub struct NegotiationEngine {
    state: EngineState,
    /// Bumped on every join and close; spawned work carries the value it
    /// was started under.
    generation: u64,
    room_id: String,
    identity: String,
    ice: IceConfig,
    constraints: MediaConstraints,
    caps: Capabilities,
    sender: Sender,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    driver_tx: mpsc::UnboundedSender<DriverEvent>,
    session: Option<Arc<dyn NegotiationSession>>,
    local_media: Option<LocalMedia>,
    /// Candidates that arrived before the session existed, in wire order.
    pending_candidates: Vec<Value>,
    /// Dedup keys for remote track notifications: (stream id, track id).
    known_tracks: HashSet<(String, String)>,
    /// Streams announced to the view, keyed by the collaborator-reported
    /// stream id.
    participants: HashSet<String>,
}

impl NegotiationEngine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        room_id: String,
        identity: String,
        ice: IceConfig,
        constraints: MediaConstraints,
        caps: Capabilities,
        sender: Sender,
        events_tx: mpsc::UnboundedSender<EngineEvent>,
        driver_tx: mpsc::UnboundedSender<DriverEvent>,
    ) -> Self {
        Self {
            state: EngineState::Idle,
            generation: 0,
            room_id,
            identity,
            ice,
            constraints,
            caps,
            sender,
            events_tx,
            driver_tx,
            session: None,
            local_media: None,
            pending_candidates: Vec::new(),
            known_tracks: HashSet::new(),
            participants: HashSet::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Start the join: acquire local media off the driver loop so inbound
    /// envelopes keep flowing while the collaborator prompts for devices.
    pub(crate) fn begin_join(&mut self) {
        self.generation += 1;
        self.state = EngineState::AwaitingLocalMedia;
        tracing::info!(room = %self.room_id, "joining room, acquiring local media");

        let media = Arc::clone(&self.caps.media);
        let constraints = self.constraints;
        let generation = self.generation;
        let tx = self.driver_tx.clone();
        tokio::spawn(async move {
            let result = media.acquire_local_media(constraints).await;
            let _ = tx.send(DriverEvent::MediaReady { generation, result });
        });
    }

    /// Local media resolved. Creates the session and makes the opening
    /// offer; returns the session's event receiver for the driver loop.
    pub(crate) async fn on_media_ready(
        &mut self,
        generation: u64,
        result: Result<LocalMedia>,
    ) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        if generation != self.generation {
            tracing::debug!(generation, "ignoring media result from a discarded join");
            return None;
        }
        if self.state != EngineState::AwaitingLocalMedia {
            tracing::warn!(state = ?self.state, "unexpected media result");
            return None;
        }

        let media = match result {
            Ok(media) => media,
            Err(e) => {
                tracing::error!(room = %self.room_id, error = %e, "media acquisition failed");
                self.caps
                    .render
                    .show_alert("could not access camera or microphone");
                self.close("media acquisition failed");
                return None;
            }
        };

        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let session = match self.caps.negotiation.create_session(&self.ice, ev_tx).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(room = %self.room_id, error = %e, "session creation failed");
                return None;
            }
        };
        self.session = Some(Arc::clone(&session));

        if let Err(e) = self.bring_up(session, media).await {
            tracing::warn!(room = %self.room_id, error = %e, "session bring-up failed");
        }
        Some(ev_rx)
    }

    async fn bring_up(
        &mut self,
        session: Arc<dyn NegotiationSession>,
        media: LocalMedia,
    ) -> Result<()> {
        session.add_local_media(&media).await?;
        self.local_media = Some(media);

        // Candidates that raced session creation, in original arrival order.
        for cand in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = session.add_candidate(cand).await {
                tracing::warn!(error = %e, "queued candidate rejected");
            }
        }

        self.state = EngineState::Offering;
        let offer = session.create_offer().await?;
        session.set_local_description(offer.clone()).await?;
        self.sender
            .send(&OutgoingEnvelope::new(EventKind::Offer, offer));
        self.state = EngineState::Negotiating;
        tracing::info!(room = %self.room_id, "offer sent, awaiting answer");
        Ok(())
    }

    /// Consume one inbound envelope. Failures are logged here; the state
    /// machine never transitions on error.
    pub(crate) async fn handle_envelope(&mut self, env: Envelope) {
        let kind = env.kind;
        if let Err(e) = self.dispatch(env).await {
            tracing::warn!(kind = kind.as_str(), error = %e, "envelope handling failed");
        }
    }

    async fn dispatch(&mut self, env: Envelope) -> Result<()> {
        match env.kind {
            EventKind::Offer => self.on_offer(env.payload_value()?).await,
            EventKind::Answer => self.on_answer(env.payload_value()?).await,
            EventKind::Candidate => self.on_candidate(env.payload_value()?).await,
            EventKind::ReceiveMessage => self.on_receive_message(env.payload_as()?),
            EventKind::SendMessage => {
                tracing::warn!("relay forwarded a client-bound send_message; ignoring");
                Ok(())
            }
            EventKind::ChangeRoom => {
                tracing::debug!("change_room is reserved and unimplemented");
                Ok(())
            }
        }
    }

    async fn on_offer(&mut self, desc: Value) -> Result<()> {
        if self.state == EngineState::Closed {
            tracing::debug!("ignoring offer after close");
            return Ok(());
        }
        let session = self
            .session
            .clone()
            .ok_or_else(|| RoomLinkError::Negotiation("offer before session exists".into()))?;

        session.set_remote_description(desc).await?;
        let answer = session.create_answer().await?;
        session.set_local_description(answer.clone()).await?;
        self.sender
            .send(&OutgoingEnvelope::new(EventKind::Answer, answer));
        self.state = EngineState::Established;
        tracing::info!(room = %self.room_id, "remote offer answered");
        Ok(())
    }

    async fn on_answer(&mut self, desc: Value) -> Result<()> {
        if self.state != EngineState::Negotiating {
            tracing::warn!(state = ?self.state, "ignoring answer outside negotiation");
            return Ok(());
        }
        let session = self
            .session
            .clone()
            .ok_or_else(|| RoomLinkError::Negotiation("answer before session exists".into()))?;

        session.set_remote_description(desc).await?;
        self.state = EngineState::Established;
        tracing::info!(room = %self.room_id, "answer applied, session established");
        Ok(())
    }

    async fn on_candidate(&mut self, candidate: Value) -> Result<()> {
        match self.state {
            EngineState::Idle | EngineState::Closed => {
                tracing::debug!("dropping candidate outside a call");
                Ok(())
            }
            _ => match self.session.clone() {
                // Candidate delivery races local media acquisition; hold it
                // until the session exists.
                None => {
                    self.pending_candidates.push(candidate);
                    Ok(())
                }
                Some(session) => session.add_candidate(candidate).await,
            },
        }
    }

    fn on_receive_message(&mut self, payload: ReceiveMessagePayload) -> Result<()> {
        let _ = self.events_tx.send(EngineEvent::Chat(payload.into()));
        Ok(())
    }

    /// Outbound chat. No local echo: the line renders only once the relay
    /// reflects it back as `receive_message`.
    pub(crate) fn send_chat(&self, text: &str) {
        let payload = SendMessagePayload {
            message: text.to_string(),
            from: self.identity.clone(),
        };
        match serde_json::to_value(&payload) {
            Ok(v) => self
                .sender
                .send(&OutgoingEnvelope::new(EventKind::SendMessage, v)),
            Err(e) => tracing::warn!(error = %e, "chat payload encode failed"),
        }
    }

    /// Notification from the live session's collaborator.
    pub(crate) async fn on_session_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::LocalCandidate(candidate) => {
                self.sender
                    .send(&OutgoingEnvelope::new(EventKind::Candidate, candidate));
            }
            SessionEvent::TrackAdded {
                stream_id,
                track_id,
                kind,
            } => {
                // The collaborator may re-fire track callbacks during ICE
                // restarts; dedup on (stream, track).
                if !self.known_tracks.insert((stream_id.clone(), track_id)) {
                    tracing::debug!(stream = %stream_id, "duplicate track notification ignored");
                    return;
                }
                self.participants.insert(stream_id.clone());
                let _ = self.events_tx.send(EngineEvent::TrackAdded {
                    participant: stream_id,
                    kind,
                });
            }
            SessionEvent::StreamClosed { stream_id } => {
                if self.participants.remove(&stream_id) {
                    self.known_tracks.retain(|(s, _)| s != &stream_id);
                    let _ = self.events_tx.send(EngineEvent::TrackRemoved {
                        participant: stream_id,
                    });
                }
            }
        }
    }

    /// Drive the state machine to `Closed`: tear down the session, stop
    /// local capture, and evict every remote participant so the view
    /// cleans up.
    pub(crate) fn close(&mut self, reason: &str) {
        if self.state == EngineState::Closed {
            return;
        }
        tracing::info!(room = %self.room_id, reason, "closing negotiation");
        self.state = EngineState::Closed;
        self.generation += 1;

        if let Some(session) = self.session.take() {
            session.close();
        }
        if let Some(media) = self.local_media.take() {
            self.caps.media.stop_tracks(&media);
        }
        self.pending_candidates.clear();
        self.known_tracks.clear();
        for participant in std::mem::take(&mut self.participants) {
            let _ = self
                .events_tx
                .send(EngineEvent::TrackRemoved { participant });
        }
    }
}
