//! The session worker: owns one connection at a time.
//!
//! The worker runs on its own thread inside a current-thread tokio runtime
//! (see [`RemoteDesktopSession::spawn`](super::session::RemoteDesktopSession::spawn)).
//! Host calls arrive as [`SessionCommand`]s on an mpsc queue and are handled
//! strictly one after another, so connect, disconnect and input never
//! interleave.  Input that was sent before a `disconnect()` reaches the
//! endpoint before the connection closes.
//!
//! While connected the worker also owns two spawned tasks:
//!
//! - the **refresh loop**, which owns the connection's update reader, paces
//!   incremental update requests at the configured frame rate and publishes
//!   each decoded frame;
//! - the **audio pump**, which accumulates PCM into fixed-size chunks.
//!
//! The command loop keeps the input writer, so a pending update request
//! never holds up input or a disconnect.  Both tasks are aborted and joined
//! before the writer is closed.  The refresh
//! loop reports its own exit (endpoint closed, protocol violation) through an
//! internal queue tagged with a connection generation; an exit report for a
//! connection that has already been torn down is ignored, which keeps the
//! `disconnected` event to exactly one per connection.

use std::sync::Arc;
use std::time::Duration;

use deskbridge_core::{AudioAccumulator, ButtonMask, Frame, KeyPhase, Keysym, MouseButton, ScrollDirection};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use super::transport::{FramebufferConnector, InputWriter, TransportError, UpdateReader};
use crate::application::EventDispatcher;
use crate::domain::{DisconnectReason, RemoteAddress, SessionConfig, SessionError, SessionEvent, SessionId, SessionState};

const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

type FrameSlot = Arc<watch::Sender<Option<Arc<Frame>>>>;

pub(crate) enum SessionCommand {
    Connect {
        address: RemoteAddress,
        reconnect: bool,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Key {
        symbol: Keysym,
        phase: KeyPhase,
    },
    Pointer(PointerUpdate),
    Aim {
        target: PointerTarget,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PointerUpdate {
    Move { x: u16, y: u16 },
    Button { button: MouseButton, pressed: bool },
    Scroll(ScrollDirection),
}

/// A pointer destination checked against the current screen size.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PointerTarget {
    To { x: i64, y: i64 },
    By { dx: i64, dy: i64 },
    Center,
    FarCorner,
}

struct LoopExit {
    generation: u64,
    reason: DisconnectReason,
}

#[derive(Default)]
struct PointerState {
    x: u16,
    y: u16,
    buttons: ButtonMask,
}

struct LiveConnection {
    generation: u64,
    address: RemoteAddress,
    input: Box<dyn InputWriter>,
    refresh: JoinHandle<()>,
    audio: Option<JoinHandle<()>>,
    pointer: PointerState,
}

pub(crate) struct Worker {
    id: SessionId,
    config: SessionConfig,
    connector: Arc<dyn FramebufferConnector>,
    dispatcher: EventDispatcher,
    state: watch::Sender<SessionState>,
    frame: FrameSlot,
    live: Option<LiveConnection>,
    generation: u64,
    exits_tx: mpsc::UnboundedSender<LoopExit>,
    exits_rx: Option<mpsc::UnboundedReceiver<LoopExit>>,
}

impl Worker {
    pub(crate) fn new(
        id: SessionId,
        config: SessionConfig,
        connector: Arc<dyn FramebufferConnector>,
        dispatcher: EventDispatcher,
        state: watch::Sender<SessionState>,
        frame: watch::Sender<Option<Arc<Frame>>>,
    ) -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        Self {
            id,
            config,
            connector,
            dispatcher,
            state,
            frame: Arc::new(frame),
            live: None,
            generation: 0,
            exits_tx,
            exits_rx: Some(exits_rx),
        }
    }

    /// Handles commands until shutdown or until every handle is dropped,
    /// then tears down any live connection and drains pending events.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let Some(mut exits) = self.exits_rx.take() else {
            return;
        };
        debug!("session {}: worker started", self.id);

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                Some(exit) = exits.recv() => self.on_loop_exit(exit).await,
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown { reply }) => {
                        shutdown_reply = reply;
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }

        self.teardown(DisconnectReason::Shutdown).await;
        self.dispatcher.flush().await;
        debug!("session {}: worker stopped", self.id);
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect {
                address,
                reconnect,
                reply,
            } => {
                let result = self.connect(address, reconnect).await;
                let _ = reply.send(result);
            }
            SessionCommand::Disconnect { reply } => {
                self.teardown(DisconnectReason::Requested).await;
                let _ = reply.send(());
            }
            SessionCommand::Key { symbol, phase } => self.forward_key(symbol, phase).await,
            SessionCommand::Pointer(update) => self.forward_pointer(update).await,
            SessionCommand::Aim { target, reply } => {
                let result = self.aim(target).await;
                let _ = reply.send(result);
            }
            SessionCommand::Shutdown { .. } => {}
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    async fn connect(&mut self, address: RemoteAddress, reconnect: bool) -> Result<(), SessionError> {
        if let Some(live) = &self.live {
            if !reconnect {
                debug!(
                    "session {}: already connected to {}; connect ignored",
                    self.id, live.address
                );
                return Ok(());
            }
            self.teardown(DisconnectReason::Reconnect).await;
        }

        self.set_state(SessionState::Connecting);
        info!("session {}: connecting to {address}", self.id);

        let timeout = self.config.connect_timeout();
        let connection = match tokio::time::timeout(timeout, self.connector.connect(&address)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(self.connect_failed(address, e.to_string())),
            Err(_) => {
                let reason = format!("no handshake within {} ms", timeout.as_millis());
                return Err(self.connect_failed(address, reason));
            }
        };

        self.generation += 1;
        let generation = self.generation;

        self.set_state(SessionState::Ready);
        info!("session {}: ready on {address} (connection #{generation})", self.id);
        self.dispatcher.dispatch_and_wait(SessionEvent::Ready).await;

        let refresh = tokio::spawn(
            RefreshLoop {
                id: self.id,
                generation,
                period: self.config.refresh_period(),
                updates: connection.updates,
                frame: self.frame.clone(),
                dispatcher: self.dispatcher.clone(),
                exits: self.exits_tx.clone(),
            }
            .run(),
        );
        let audio = connection.audio.map(|pcm| {
            let accumulator = AudioAccumulator::new(self.config.audio.format(), self.config.audio.chunk_duration());
            tokio::spawn(audio_pump(self.id, pcm, accumulator, self.dispatcher.clone()))
        });

        self.live = Some(LiveConnection {
            generation,
            address,
            input: connection.input,
            refresh,
            audio,
            pointer: PointerState::default(),
        });
        Ok(())
    }

    fn connect_failed(&self, address: RemoteAddress, reason: String) -> SessionError {
        warn!("session {}: cannot connect to {address}: {reason}", self.id);
        self.set_state(SessionState::Disconnected);
        SessionError::TransportUnavailable { address, reason }
    }

    /// Stops the background tasks, closes the connection and emits
    /// `disconnected`.  No-op when nothing is connected.
    async fn teardown(&mut self, reason: DisconnectReason) {
        let Some(mut live) = self.live.take() else {
            return;
        };
        self.set_state(SessionState::Closing);

        live.refresh.abort();
        let _ = live.refresh.await;
        if let Some(audio) = live.audio {
            audio.abort();
            let _ = audio.await;
        }
        live.input.close().await;

        self.frame.send_replace(None);
        self.set_state(SessionState::Disconnected);
        info!(
            "session {}: disconnected from {} ({reason})",
            self.id, live.address
        );
        self.dispatcher.dispatch(SessionEvent::Disconnected { reason });
    }

    async fn on_loop_exit(&mut self, exit: LoopExit) {
        let current = self.live.as_ref().map(|live| live.generation);
        if current == Some(exit.generation) {
            self.teardown(exit.reason).await;
        } else {
            trace!(
                "session {}: ignoring exit of stale refresh loop #{}",
                self.id, exit.generation
            );
        }
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!("session {}: {previous} -> {state}", self.id);
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    async fn forward_key(&mut self, symbol: Keysym, phase: KeyPhase) {
        let Some(live) = self.live.as_mut() else {
            trace!("session {}: not ready, dropping key {symbol}", self.id);
            return;
        };
        debug!("session {}: key {symbol} {phase:?}", self.id);
        let result = live.input.key_event(symbol, phase == KeyPhase::Down).await;
        if let Err(e) = result {
            warn!("session {}: key event failed: {e}", self.id);
        }
    }

    async fn forward_pointer(&mut self, update: PointerUpdate) {
        let Some(live) = self.live.as_mut() else {
            trace!("session {}: not ready, dropping pointer {update:?}", self.id);
            return;
        };
        debug!("session {}: pointer {update:?}", self.id);

        let pointer = &mut live.pointer;
        let input = &mut live.input;
        let result = match update {
            PointerUpdate::Move { x, y } => {
                pointer.x = x;
                pointer.y = y;
                input.pointer_event(x, y, pointer.buttons).await
            }
            PointerUpdate::Button { button, pressed } => {
                if pressed {
                    pointer.buttons.press(button);
                } else {
                    pointer.buttons.release(button);
                }
                input.pointer_event(pointer.x, pointer.y, pointer.buttons).await
            }
            PointerUpdate::Scroll(direction) => {
                let wheel = pointer.buttons.with_wheel(direction);
                match input.pointer_event(pointer.x, pointer.y, wheel).await {
                    Ok(()) => input.pointer_event(pointer.x, pointer.y, pointer.buttons).await,
                    Err(e) => Err(e),
                }
            }
        };
        if let Err(e) = result {
            warn!("session {}: pointer event failed: {e}", self.id);
        }
    }

    /// Resolves `target` against the tracked cursor and the current frame,
    /// then moves there.  Coordinates up to and including the screen size
    /// are accepted.
    async fn aim(&mut self, target: PointerTarget) -> Result<(), SessionError> {
        let frame = self.frame.borrow().clone();
        let (Some(live), Some(frame)) = (self.live.as_ref(), frame) else {
            warn!("session {}: not connected or no screen yet; {target:?} refused", self.id);
            return Err(SessionError::NotRunning);
        };

        let (x, y) = match target {
            PointerTarget::To { x, y } => (x, y),
            PointerTarget::By { dx, dy } => (i64::from(live.pointer.x) + dx, i64::from(live.pointer.y) + dy),
            PointerTarget::Center => {
                let (x, y) = frame.center();
                (i64::from(x), i64::from(y))
            }
            PointerTarget::FarCorner => (i64::from(frame.width), i64::from(frame.height)),
        };

        match (u16::try_from(x), u16::try_from(y)) {
            (Ok(px), Ok(py)) if frame.admits_pointer(px, py) => {
                self.forward_pointer(PointerUpdate::Move { x: px, y: py }).await;
                Ok(())
            }
            _ => {
                debug!(
                    "session {}: ({x}, {y}) is outside the {}x{} screen",
                    self.id, frame.width, frame.height
                );
                Err(SessionError::OutOfBounds {
                    x,
                    y,
                    width: frame.width,
                    height: frame.height,
                })
            }
        }
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

struct RefreshLoop {
    id: SessionId,
    generation: u64,
    period: Duration,
    updates: Box<dyn UpdateReader>,
    frame: FrameSlot,
    dispatcher: EventDispatcher,
    exits: mpsc::UnboundedSender<LoopExit>,
}

impl RefreshLoop {
    async fn run(mut self) {
        let reason = self.poll().await;
        debug!(
            "session {}: refresh loop #{} ended ({reason})",
            self.id, self.generation
        );
        let _ = self.exits.send(LoopExit {
            generation: self.generation,
            reason,
        });
    }

    async fn poll(&mut self) -> DisconnectReason {
        let mut ticker = tokio::time::interval(self.period.max(MIN_REFRESH_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.updates.is_closed() {
                return DisconnectReason::TransportClosed;
            }

            match self.updates.request_update(true).await {
                Ok(Some(frame)) => {
                    let frame = Arc::new(frame);
                    self.frame.send_replace(Some(frame.clone()));
                    self.dispatcher.dispatch(SessionEvent::ScreenUpdate(frame));
                }
                Ok(None) => {}
                Err(TransportError::Closed) => return DisconnectReason::TransportClosed,
                Err(TransportError::Protocol(detail)) => {
                    warn!("session {}: protocol violation: {detail}", self.id);
                    return DisconnectReason::ProtocolViolation(detail);
                }
                Err(e) => {
                    warn!("session {}: update request failed: {e}", self.id);
                    return DisconnectReason::TransportFault(e.to_string());
                }
            }
        }
    }
}

async fn audio_pump(
    id: SessionId,
    mut pcm: mpsc::Receiver<Vec<u8>>,
    mut accumulator: AudioAccumulator,
    dispatcher: EventDispatcher,
) {
    while let Some(bytes) = pcm.recv().await {
        for chunk in accumulator.push(&bytes) {
            trace!("session {id}: audio chunk of {} bytes", chunk.len());
            dispatcher.dispatch(SessionEvent::AudioChunk(Arc::new(chunk)));
        }
    }
    debug!(
        "session {id}: audio stream ended with {} bytes unflushed",
        accumulator.len()
    );
}
