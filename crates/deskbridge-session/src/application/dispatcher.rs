//! Event dispatch from the session worker to host handlers.
//!
//! The dispatcher is split in two halves:
//!
//! - [`EventDispatcher`] is a cheap, cloneable sender.  The host registers
//!   handlers through it and the worker publishes events through it.
//! - [`DeliveryLoop`] owns the handler table and invokes handlers, one event
//!   at a time, in the order events were published.  The owner spawns
//!   [`DeliveryLoop::run`] on whatever runtime should drive delivery.
//!
//! Registration travels through the same queue as events, so an event
//! published after `register` returns is always seen by the new handler.
//!
//! Screen updates are coalesced: at most one `screen_update` waits in the
//! queue, and a newer frame replaces it in place.  A slow frame consumer
//! therefore sees the latest frame instead of a growing backlog.  `ready`
//! and `disconnected` close the pending slot, so a frame is never delivered
//! on the wrong side of a connection boundary.  `audio_chunk` events are
//! never coalesced.
//!
//! Handlers are synchronous closures.  Each call runs on the blocking pool so
//! a slow handler never stalls the runtime that publishes events; a handler
//! that returns an error or panics is logged and does not affect later events.

use std::sync::{Arc, Mutex, PoisonError};

use deskbridge_core::Frame;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::domain::{EventKind, SessionEvent};

/// Host callback for one event kind.
pub type EventHandler = Arc<dyn Fn(SessionEvent) -> anyhow::Result<()> + Send + Sync>;

enum DispatchMessage {
    Register {
        kind: EventKind,
        handler: Option<EventHandler>,
    },
    Event {
        event: SessionEvent,
        ack: Option<oneshot::Sender<()>>,
    },
    Frame(Arc<PendingFrame>),
    Flush(oneshot::Sender<()>),
}

/// Queued `screen_update` whose frame may be replaced until delivery takes
/// it.
#[derive(Default)]
struct PendingFrame(Mutex<Option<Arc<Frame>>>);

impl PendingFrame {
    fn take(&self) -> Option<Arc<Frame>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Publishing and registration half of the dispatcher.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    /// The queued frame slot that newer frames may still replace.
    open_frame: Arc<Mutex<Option<Arc<PendingFrame>>>>,
}

/// Delivery half of the dispatcher.  Runs until every [`EventDispatcher`]
/// clone has been dropped.
pub struct DeliveryLoop {
    rx: mpsc::UnboundedReceiver<DispatchMessage>,
    handlers: [Option<EventHandler>; 4],
    label: String,
}

impl EventDispatcher {
    /// Creates a dispatcher and the loop that delivers its events.
    ///
    /// `label` prefixes every log line the delivery loop emits.
    pub fn new(label: impl Into<String>) -> (Self, DeliveryLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        let delivery = DeliveryLoop {
            rx,
            handlers: Default::default(),
            label: label.into(),
        };
        let dispatcher = Self {
            tx,
            open_frame: Arc::default(),
        };
        (dispatcher, delivery)
    }

    /// Sets the handler for `kind`, replacing any previous one.
    pub fn register<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(SessionEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.send(DispatchMessage::Register {
            kind,
            handler: Some(Arc::new(handler)),
        });
    }

    /// Removes the handler for `kind`, if any.
    pub fn unregister(&self, kind: EventKind) {
        self.send(DispatchMessage::Register { kind, handler: None });
    }

    /// Queues `event` for delivery and returns immediately.
    ///
    /// A `screen_update` replaces one that is still waiting.  If no handler
    /// is registered for the event's kind when it is delivered, the event is
    /// dropped.
    pub fn dispatch(&self, event: SessionEvent) {
        match event {
            SessionEvent::ScreenUpdate(frame) => self.dispatch_frame(frame),
            event => {
                self.send_event(event, None);
            }
        }
    }

    /// Queues `event` and waits until its handler (if any) has returned.
    pub async fn dispatch_and_wait(&self, event: SessionEvent) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.send_event(event, Some(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    /// Waits until every event queued before this call has been delivered.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.send(DispatchMessage::Flush(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    fn dispatch_frame(&self, frame: Arc<Frame>) {
        let mut open = self.open_frame.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = open.as_ref() {
            let mut slot = pending.0.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(queued) = slot.as_mut() {
                trace!("screen update replaces one still queued");
                *queued = frame;
                return;
            }
        }
        let pending = Arc::new(PendingFrame(Mutex::new(Some(frame))));
        *open = Some(pending.clone());
        self.send(DispatchMessage::Frame(pending));
    }

    fn send_event(&self, event: SessionEvent, ack: Option<oneshot::Sender<()>>) -> bool {
        // Hold the slot lock so no frame slips in between closing it and
        // queueing the boundary event.
        let mut open = self.open_frame.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(event.kind(), EventKind::Ready | EventKind::Disconnected) {
            *open = None;
        }
        self.send(DispatchMessage::Event { event, ack })
    }

    fn send(&self, message: DispatchMessage) -> bool {
        if self.tx.send(message).is_err() {
            debug!("event delivery loop has stopped; message dropped");
            return false;
        }
        true
    }
}

impl DeliveryLoop {
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                DispatchMessage::Register { kind, handler } => {
                    trace!("{}: {kind} handler replaced", self.label);
                    self.handlers[kind.index()] = handler;
                }
                DispatchMessage::Event { event, ack } => {
                    let handler = self.handlers[event.kind().index()].clone();
                    deliver(&self.label, handler, event).await;
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
                DispatchMessage::Frame(pending) => {
                    if let Some(frame) = pending.take() {
                        let handler = self.handlers[EventKind::ScreenUpdate.index()].clone();
                        deliver(&self.label, handler, SessionEvent::ScreenUpdate(frame)).await;
                    }
                }
                DispatchMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        debug!("{}: event delivery stopped", self.label);
    }
}

async fn deliver(label: &str, handler: Option<EventHandler>, event: SessionEvent) {
    let kind = event.kind();
    let Some(handler) = handler else {
        trace!("{label}: no handler for {kind}");
        return;
    };

    match tokio::task::spawn_blocking(move || handler(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{label}: {kind} handler failed: {e:#}"),
        Err(join) if join.is_panic() => error!("{label}: {kind} handler panicked"),
        Err(join) => warn!("{label}: {kind} handler did not complete: {join}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::domain::DisconnectReason;

    fn started() -> EventDispatcher {
        let (dispatcher, delivery) = EventDispatcher::new("test");
        tokio::spawn(delivery.run());
        dispatcher
    }

    fn forward_to(tx: mpsc::UnboundedSender<SessionEvent>) -> impl Fn(SessionEvent) -> anyhow::Result<()> {
        move |event| {
            tx.send(event)?;
            Ok(())
        }
    }

    fn frame(width: u16) -> SessionEvent {
        SessionEvent::ScreenUpdate(Arc::new(Frame::new(width, 1, vec![0; width as usize * 4])))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("handler channel closed")
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_publish_order() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for kind in EventKind::ALL {
            dispatcher.register(kind, forward_to(tx.clone()));
        }

        // Act
        dispatcher.dispatch(SessionEvent::Ready);
        dispatcher.dispatch(frame(1));
        dispatcher.dispatch(SessionEvent::AudioChunk(Arc::new(vec![7; 4])));
        dispatcher.dispatch(SessionEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });
        dispatcher.dispatch(frame(2));

        // Assert
        assert!(matches!(next(&mut rx).await, SessionEvent::Ready));
        assert!(matches!(next(&mut rx).await, SessionEvent::ScreenUpdate(f) if f.width == 1));
        assert!(matches!(next(&mut rx).await, SessionEvent::AudioChunk(_)));
        assert!(matches!(next(&mut rx).await, SessionEvent::Disconnected { .. }));
        assert!(matches!(next(&mut rx).await, SessionEvent::ScreenUpdate(f) if f.width == 2));
    }

    #[tokio::test]
    async fn test_queued_frames_collapse_to_latest() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.register(EventKind::ScreenUpdate, forward_to(tx));

        // Act
        for width in 1..=5 {
            dispatcher.dispatch(frame(width));
        }
        dispatcher.flush().await;

        // Assert
        assert!(matches!(next(&mut rx).await, SessionEvent::ScreenUpdate(f) if f.width == 5));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_frame_handler_gets_latest_frame_not_backlog() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.register(EventKind::ScreenUpdate, move |event| {
            tx.send(event)?;
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        });
        dispatcher.dispatch(frame(1));
        assert!(matches!(next(&mut rx).await, SessionEvent::ScreenUpdate(f) if f.width == 1));

        // Act: the handler is still busy with frame 1
        for width in 2..=40 {
            dispatcher.dispatch(frame(width));
        }
        dispatcher.flush().await;

        // Assert
        assert!(matches!(next(&mut rx).await, SessionEvent::ScreenUpdate(f) if f.width == 40));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_event_without_handler_is_dropped() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.register(EventKind::Disconnected, forward_to(tx));

        // Act
        dispatcher.dispatch(SessionEvent::Ready);
        dispatcher.dispatch(SessionEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });
        dispatcher.flush().await;

        // Assert
        assert!(matches!(next(&mut rx).await, SessionEvent::Disconnected { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_replaces_previous_handler() {
        // Arrange
        let dispatcher = started();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = first.clone();
        dispatcher.register(EventKind::Ready, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let s = second.clone();
        dispatcher.register(EventKind::Ready, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // Act
        dispatcher.dispatch_and_wait(SessionEvent::Ready).await;

        // Assert
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregister_silences_kind() {
        let dispatcher = started();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        dispatcher.register(EventKind::Ready, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        dispatcher.unregister(EventKind::Ready);

        dispatcher.dispatch_and_wait(SessionEvent::Ready).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_delivery() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forward = forward_to(tx);
        dispatcher.register(EventKind::AudioChunk, move |event| {
            if let SessionEvent::AudioChunk(pcm) = &event {
                if pcm.len() == 1 {
                    anyhow::bail!("rejecting short chunk");
                }
            }
            forward(event)
        });

        // Act
        dispatcher.dispatch(SessionEvent::AudioChunk(Arc::new(vec![0])));
        dispatcher.dispatch(SessionEvent::AudioChunk(Arc::new(vec![0, 0])));

        // Assert
        match next(&mut rx).await {
            SessionEvent::AudioChunk(pcm) => assert_eq!(pcm.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_delivery() {
        // Arrange
        let dispatcher = started();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.register(EventKind::Ready, |_| panic!("handler bug"));
        dispatcher.register(EventKind::AudioChunk, forward_to(tx));

        // Act
        dispatcher.dispatch(SessionEvent::Ready);
        dispatcher.dispatch(SessionEvent::AudioChunk(Arc::new(vec![1, 2, 3, 4])));

        // Assert
        match next(&mut rx).await {
            SessionEvent::AudioChunk(pcm) => assert_eq!(pcm.as_slice(), &[1, 2, 3, 4]),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_and_wait_returns_after_handler_completes() {
        // Arrange
        let dispatcher = started();
        let done = Arc::new(AtomicBool::new(false));
        let d = done.clone();
        dispatcher.register(EventKind::Ready, move |_| {
            std::thread::sleep(Duration::from_millis(20));
            d.store(true, Ordering::SeqCst);
            Ok(())
        });

        // Act
        dispatcher.dispatch_and_wait(SessionEvent::Ready).await;

        // Assert
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_after_loop_stops_is_a_no_op() {
        let (dispatcher, delivery) = EventDispatcher::new("test");
        drop(delivery);

        dispatcher.dispatch(SessionEvent::Ready);
        dispatcher.dispatch_and_wait(SessionEvent::Ready).await;
        dispatcher.flush().await;
    }
}
