//! Transport channel: one signaling connection per room membership.
//!
//! Responsibilities:
//! - Open the relay connection scoped to a room id
//! - Deliver decoded inbound envelopes in wire order (FIFO per connection)
//! - Gate outbound sends on the connection state
//! - Reconnect with a fixed backoff on unexpected close, indefinitely
//!
//! The io task is the only owner of the socket, so at most one connection
//! attempt is outstanding at any time.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use roomlink_core::protocol::envelope::{Envelope, OutgoingEnvelope};

use crate::caps::RenderCapability;
use crate::config::RelaySection;
use crate::transport::codec;

/// Connection lifecycle state, owned by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Cheap handle for producing outbound envelopes.
#[derive(Clone)]
pub struct Sender {
    out_tx: mpsc::Sender<String>,
    state: watch::Receiver<ConnectionState>,
}

impl Sender {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Fire-and-forget transmit. No-op with a logged warning unless the
    /// channel is connected.
    pub fn send(&self, env: &OutgoingEnvelope) {
        if self.state() != ConnectionState::Connected {
            tracing::warn!(kind = env.kind.as_str(), "dropping send: channel not connected");
            return;
        }
        match env.encode() {
            Ok(frame) => {
                if self.out_tx.try_send(frame).is_err() {
                    tracing::warn!(kind = env.kind.as_str(), "dropping send: writer queue full");
                }
            }
            Err(e) => tracing::warn!(error = %e, "dropping send: encode failed"),
        }
    }
}

/// Owns the io task for one room-scoped signaling connection.
pub struct Channel {
    sender: Sender,
    shutdown: Arc<Notify>,
}

impl Channel {
    /// Open a signaling connection for `room_id` and spawn the io task.
    ///
    /// A construction failure never surfaces as an error here: the channel
    /// settles into `Disconnected` and the failure is alerted through the
    /// render collaborator.
    pub fn connect(
        relay: &RelaySection,
        room_id: &str,
        render: Arc<dyn RenderCapability>,
    ) -> (Channel, mpsc::Receiver<Envelope>) {
        let url = format!("{}?roomID={}", relay.url, room_id);
        let backoff = Duration::from_millis(relay.reconnect_backoff_ms);

        let (out_tx, out_rx) = mpsc::channel::<String>(1024);
        let (in_tx, in_rx) = mpsc::channel::<Envelope>(1024);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let shutdown = Arc::new(Notify::new());

        let task_shutdown = Arc::clone(&shutdown);
        let task_room = room_id.to_string();
        tokio::spawn(async move {
            run_io(url, task_room, backoff, render, state_tx, out_rx, in_tx, task_shutdown).await;
        });

        let channel = Channel {
            sender: Sender {
                out_tx,
                state: state_rx,
            },
            shutdown,
        };
        (channel, in_rx)
    }

    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Watch handle over the connection state.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.sender.state.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// Terminal close. The io task exits and the inbound channel ends.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum PumpExit {
    Shutdown,
    Closed,
}

#[allow(clippy::too_many_arguments)]
async fn run_io(
    url: String,
    room_id: String,
    backoff: Duration,
    render: Arc<dyn RenderCapability>,
    state_tx: watch::Sender<ConnectionState>,
    mut out_rx: mpsc::Receiver<String>,
    in_tx: mpsc::Sender<Envelope>,
    shutdown: Arc<Notify>,
) {
    let mut attempt: u64 = 0;
    loop {
        let conn = tokio::select! {
            _ = shutdown.notified() => break,
            res = connect_async(&url) => res,
        };
        attempt += 1;

        match conn {
            Ok((mut ws, _resp)) => {
                tracing::info!(room = %room_id, attempt, "relay connected");
                state_tx.send_replace(ConnectionState::Connected);
                render.set_link_indicator(true);

                match pump(&mut ws, &mut out_rx, &in_tx, &shutdown).await {
                    PumpExit::Shutdown => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    PumpExit::Closed => {
                        tracing::warn!(room = %room_id, "relay connection closed unexpectedly");
                    }
                }
            }
            Err(e) => {
                if attempt == 1 {
                    // Construction error: no retry, the caller sees the
                    // Disconnected state and a user-visible alert.
                    tracing::error!(room = %room_id, error = %e, "relay connect failed");
                    render.show_alert("connection to the relay failed");
                    break;
                }
                tracing::warn!(room = %room_id, attempt, error = %e, "reconnect attempt failed");
            }
        }

        state_tx.send_replace(ConnectionState::Reconnecting);
        render.set_link_indicator(false);
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = sleep(backoff) => {}
        }
        state_tx.send_replace(ConnectionState::Connecting);
    }

    state_tx.send_replace(ConnectionState::Disconnected);
    render.set_link_indicator(false);
}

async fn pump(
    ws: &mut WsStream,
    out_rx: &mut mpsc::Receiver<String>,
    in_tx: &mpsc::Sender<Envelope>,
    shutdown: &Notify,
) -> PumpExit {
    loop {
        tokio::select! {
            _ = shutdown.notified() => return PumpExit::Shutdown,

            maybe_frame = out_rx.recv() => {
                let Some(frame) = maybe_frame else { return PumpExit::Shutdown };
                if ws.send(Message::Text(frame)).await.is_err() {
                    return PumpExit::Closed;
                }
            }

            incoming = ws.next() => {
                let Some(Ok(msg)) = incoming else { return PumpExit::Closed };
                match msg {
                    Message::Text(s) => match codec::decode(&s) {
                        Ok(env) => {
                            if in_tx.send(env).await.is_err() {
                                return PumpExit::Shutdown;
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "dropping malformed frame"),
                    },
                    Message::Binary(_) => tracing::warn!("dropping unexpected binary frame"),
                    // tungstenite queues the pong reply itself
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    Message::Close(_) => return PumpExit::Closed,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn loopback() -> (
    Sender,
    mpsc::Receiver<String>,
    watch::Sender<ConnectionState>,
) {
    let (out_tx, out_rx) = mpsc::channel(64);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
    (
        Sender {
            out_tx,
            state: state_rx,
        },
        out_rx,
        state_tx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomlink_core::protocol::envelope::EventKind;

    #[tokio::test]
    async fn send_is_dropped_unless_connected() {
        let (sender, mut out_rx, state_tx) = loopback();
        state_tx.send_replace(ConnectionState::Reconnecting);

        sender.send(&OutgoingEnvelope::new(
            EventKind::Candidate,
            serde_json::json!({"candidate": "candidate:0"}),
        ));
        assert!(out_rx.try_recv().is_err());

        state_tx.send_replace(ConnectionState::Connected);
        sender.send(&OutgoingEnvelope::new(
            EventKind::Candidate,
            serde_json::json!({"candidate": "candidate:0"}),
        ));
        let frame = out_rx.try_recv().expect("frame must be queued");
        assert!(frame.contains("\"candidate\""));
    }
}
