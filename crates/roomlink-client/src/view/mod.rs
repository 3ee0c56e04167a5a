//! Session view: pure projection from engine events to rendered state.
//!
//! Holds no negotiation logic and no network state; it only maps logical
//! remote participants to render surfaces and appends chat lines. The
//! handle is `Clone` so the embedding app can inspect what is rendered.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc;

use roomlink_core::protocol::chat::ChatMessage;

use crate::caps::{RenderCapability, TrackKind};
use crate::engine::events::EngineEvent;

#[derive(Clone)]
pub struct SessionView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    render: Arc<dyn RenderCapability>,
    /// Allocated surfaces, keyed by (participant, kind).
    surfaces: DashMap<(String, TrackKind), ()>,
    /// Ordered chat log: arrival order, duplicates preserved.
    chat: Mutex<Vec<ChatMessage>>,
}

impl SessionView {
    pub fn new(render: Arc<dyn RenderCapability>) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                render,
                surfaces: DashMap::new(),
                chat: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Consume engine events until the engine goes away.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
        while let Some(ev) = rx.recv().await {
            self.apply(ev);
        }
    }

    pub fn apply(&self, ev: EngineEvent) {
        match ev {
            EngineEvent::TrackAdded { participant, kind } => self.on_track_added(&participant, kind),
            EngineEvent::TrackRemoved { participant } => self.on_track_removed(&participant),
            EngineEvent::Chat(msg) => self.on_chat_message(msg),
        }
    }

    /// Allocate and attach one surface per (participant, kind). Idempotent
    /// under duplicate calls.
    pub fn on_track_added(&self, participant: &str, kind: TrackKind) {
        let key = (participant.to_string(), kind);
        if self.inner.surfaces.insert(key, ()).is_some() {
            tracing::debug!(participant, kind = kind.as_str(), "surface already rendered");
            return;
        }
        self.inner.render.attach_surface(participant, kind);
    }

    /// Detach every surface of the participant. No-op if none exist.
    pub fn on_track_removed(&self, participant: &str) {
        let keys: Vec<(String, TrackKind)> = self
            .inner
            .surfaces
            .iter()
            .filter(|e| e.key().0 == participant)
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            if self.inner.surfaces.remove(&key).is_some() {
                self.inner.render.detach_surface(&key.0, key.1);
            }
        }
    }

    /// Append in arrival order. Never reorders, never deduplicates: a
    /// duplicate delivery produces a duplicate line.
    pub fn on_chat_message(&self, msg: ChatMessage) {
        let line = format!("{} ({}): {}", msg.from, msg.sent_at, msg.body);
        self.inner.render.append_chat_line(&line);
        let mut log = self.inner.chat.lock().unwrap_or_else(|e| e.into_inner());
        log.push(msg);
    }

    pub fn has_surface(&self, participant: &str, kind: TrackKind) -> bool {
        self.inner
            .surfaces
            .contains_key(&(participant.to_string(), kind))
    }

    pub fn surface_count(&self) -> usize {
        self.inner.surfaces.len()
    }

    pub fn chat_log(&self) -> Vec<ChatMessage> {
        self.inner
            .chat
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRender {
        attached: AtomicUsize,
        detached: AtomicUsize,
        lines: Mutex<Vec<String>>,
    }

    impl RenderCapability for CountingRender {
        fn attach_surface(&self, _participant: &str, _kind: TrackKind) {
            self.attached.fetch_add(1, Ordering::SeqCst);
        }
        fn detach_surface(&self, _participant: &str, _kind: TrackKind) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
        fn append_chat_line(&self, line: &str) {
            self.lines
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(line.to_string());
        }
        fn show_alert(&self, _message: &str) {}
        fn set_link_indicator(&self, _up: bool) {}
    }

    fn msg(from: &str, body: &str) -> ChatMessage {
        ChatMessage {
            from: from.into(),
            body: body.into(),
            sent_at: "2024-03-11T09:30:00Z".into(),
        }
    }

    #[test]
    fn duplicate_track_added_allocates_one_surface() {
        let render = Arc::new(CountingRender::default());
        let view = SessionView::new(render.clone());

        view.on_track_added("stream-1", TrackKind::Video);
        view.on_track_added("stream-1", TrackKind::Video);

        assert_eq!(render.attached.load(Ordering::SeqCst), 1);
        assert_eq!(view.surface_count(), 1);
    }

    #[test]
    fn removal_detaches_all_kinds_and_absent_is_noop() {
        let render = Arc::new(CountingRender::default());
        let view = SessionView::new(render.clone());

        view.on_track_added("stream-1", TrackKind::Video);
        view.on_track_added("stream-1", TrackKind::Audio);
        view.on_track_removed("stream-1");
        view.on_track_removed("stream-1");
        view.on_track_removed("never-seen");

        assert_eq!(render.detached.load(Ordering::SeqCst), 2);
        assert_eq!(view.surface_count(), 0);
    }

    #[test]
    fn chat_keeps_arrival_order_and_duplicates() {
        let render = Arc::new(CountingRender::default());
        let view = SessionView::new(render.clone());

        view.on_chat_message(msg("a", "one"));
        view.on_chat_message(msg("b", "two"));
        view.on_chat_message(msg("a", "one"));

        let log = view.chat_log();
        let bodies: Vec<&str> = log.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two", "one"]);
        assert_eq!(
            render.lines.lock().unwrap_or_else(|e| e.into_inner()).len(),
            3
        );
    }
}
