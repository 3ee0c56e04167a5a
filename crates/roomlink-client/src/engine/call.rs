//! Room call handle and its single-loop driver.
//!
//! All engine work runs on one select loop, so callback interleavings are
//! serialized without locks. The session-event receiver is swapped per
//! session; dropping the previous receiver discards a stale session's
//! notifications.

use std::future;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use roomlink_core::protocol::envelope::Envelope;
use roomlink_core::{Result, RoomLinkError};

use crate::caps::{Capabilities, SessionEvent};
use crate::config::ClientConfig;
use crate::engine::events::{Command, DriverEvent};
use crate::engine::negotiation::{EngineState, NegotiationEngine};
use crate::transport::{Channel, ConnectionState};
use crate::view::SessionView;

/// Live membership of one room: signaling channel, negotiation engine, and
/// session view, owned together.
pub struct RoomCall {
    commands: mpsc::UnboundedSender<Command>,
    view: SessionView,
    state: watch::Receiver<EngineState>,
    driver: JoinHandle<()>,
}

impl RoomCall {
    /// Join a room: connect the signaling channel, start media acquisition,
    /// and spawn the driver and view loops.
    pub fn join(cfg: &ClientConfig, room_id: &str, caps: Capabilities) -> Result<RoomCall> {
        cfg.validate()?;
        if room_id.is_empty() {
            return Err(RoomLinkError::Config("room id must not be empty".into()));
        }

        let (channel, inbound) = Channel::connect(&cfg.relay, room_id, caps.render.clone());

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let view = SessionView::new(caps.render.clone());
        tokio::spawn(view.clone().run(events_rx));

        let (driver_tx, internal_rx) = mpsc::unbounded_channel();
        let (cmd_tx, commands) = mpsc::unbounded_channel();

        let engine = NegotiationEngine::new(
            room_id.to_string(),
            cfg.identity.clone(),
            cfg.ice_config(),
            cfg.media_constraints(),
            caps,
            channel.sender(),
            events_tx,
            driver_tx,
        );

        let (state_tx, state_rx) = watch::channel(engine.state());
        let link = channel.state_watch();
        let driver = CallDriver {
            engine,
            channel,
            link,
            link_closed: false,
            joined: false,
            inbound,
            commands,
            internal_rx,
            session_rx: None,
            state_tx,
        };
        let handle = tokio::spawn(driver.run());

        Ok(RoomCall {
            commands: cmd_tx,
            view,
            state: state_rx,
            driver: handle,
        })
    }

    /// Current negotiation state, for display.
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn send_chat(&self, text: &str) -> Result<()> {
        self.commands
            .send(Command::SendChat(text.to_string()))
            .map_err(|_| RoomLinkError::Internal("call already ended".into()))
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// Leave the room. Idempotent: a call that already ended is fine.
    pub async fn leave(self) {
        let _ = self.commands.send(Command::Leave);
        let _ = self.driver.await;
    }
}

struct CallDriver {
    engine: NegotiationEngine,
    channel: Channel,
    link: watch::Receiver<ConnectionState>,
    link_closed: bool,
    /// The join starts on the first `Connected` transition (media capture
    /// is not prompted for while the relay is unreachable). Reconnects do
    /// not re-run it: the negotiation session outlives transport gaps.
    joined: bool,
    inbound: mpsc::Receiver<Envelope>,
    commands: mpsc::UnboundedReceiver<Command>,
    internal_rx: mpsc::UnboundedReceiver<DriverEvent>,
    session_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    state_tx: watch::Sender<EngineState>,
}

impl CallDriver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.link.changed(), if !self.link_closed => {
                    if changed.is_err() {
                        self.link_closed = true;
                    } else if !self.joined
                        && *self.link.borrow_and_update() == ConnectionState::Connected
                    {
                        self.joined = true;
                        self.engine.begin_join();
                    }
                }

                maybe_env = self.inbound.recv() => match maybe_env {
                    Some(env) => self.engine.handle_envelope(env).await,
                    // The io task exited (terminal close or construction
                    // failure): the call is over.
                    None => self.engine.close("transport closed"),
                },

                maybe_cmd = self.commands.recv() => match maybe_cmd {
                    Some(Command::SendChat(text)) => self.engine.send_chat(&text),
                    Some(Command::Leave) | None => self.engine.close("left room"),
                },

                Some(ev) = self.internal_rx.recv() => match ev {
                    DriverEvent::MediaReady { generation, result } => {
                        if let Some(rx) = self.engine.on_media_ready(generation, result).await {
                            self.session_rx = Some(rx);
                        }
                    }
                },

                ev = next_session_event(&mut self.session_rx) => match ev {
                    Some(ev) => self.engine.on_session_event(ev).await,
                    None => self.session_rx = None,
                },
            }

            self.state_tx.send_replace(self.engine.state());
            if self.engine.state() == EngineState::Closed {
                self.channel.close();
                break;
            }
        }
    }
}

async fn next_session_event(
    rx: &mut Option<mpsc::UnboundedReceiver<SessionEvent>>,
) -> Option<SessionEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}
