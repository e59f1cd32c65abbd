//! Host-facing session handle.
//!
//! [`RemoteDesktopSession`] is what the embedding application holds.  It is
//! `Send + Sync`, never blocks, and never touches the transport: every call
//! is turned into a [`SessionCommand`] for the worker thread, and the state
//! and latest frame are read from `watch` snapshots the worker publishes.
//!
//! ```ignore
//! let session = RemoteDesktopSession::spawn(config, connector)?;
//! session.on(EventKind::ScreenUpdate, |event| { /* draw */ Ok(()) });
//! session.connect("unix:/tmp/umw-vnc.sock".parse()?, false).await?;
//! session.key_down(Keysym::RETURN);
//! session.key_up(Keysym::RETURN);
//! session.disconnect().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use deskbridge_core::{Frame, KeyPhase, Keysym, MouseButton, ScrollDirection};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use super::transport::FramebufferConnector;
use super::worker::{PointerTarget, PointerUpdate, SessionCommand, Worker};
use crate::application::{EventDispatcher, InputSink, KeyReplayer};
use crate::domain::{EventKind, RemoteAddress, SessionConfig, SessionError, SessionEvent, SessionId, SessionState};

/// Pause between the two moves of [`RemoteDesktopSession::reset_cursor`].
const RESET_CURSOR_PAUSE: Duration = Duration::from_millis(10);

pub struct RemoteDesktopSession {
    id: SessionId,
    config: SessionConfig,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    frame: watch::Receiver<Option<Arc<Frame>>>,
    dispatcher: EventDispatcher,
}

impl RemoteDesktopSession {
    /// Starts the worker thread and returns a handle to it.  The session
    /// starts out `Disconnected`.
    ///
    /// # Errors
    ///
    /// [`SessionError::Spawn`] if the worker runtime or thread cannot be
    /// created.
    pub fn spawn(config: SessionConfig, connector: Arc<dyn FramebufferConnector>) -> Result<Self, SessionError> {
        let id = SessionId::new_v4();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (frame_tx, frame_rx) = watch::channel(None);
        let (dispatcher, delivery) = EventDispatcher::new(format!("session {id}"));
        let worker = Worker::new(id, config.clone(), connector, dispatcher.clone(), state_tx, frame_tx);

        std::thread::Builder::new()
            .name(format!("deskbridge-session-{}", &id.simple().to_string()[..8]))
            .spawn(move || {
                runtime.block_on(async move {
                    tokio::spawn(delivery.run());
                    worker.run(commands_rx).await;
                });
            })?;

        info!("session {id}: spawned worker for {}", config.endpoint);
        Ok(Self {
            id,
            config,
            commands: commands_tx,
            state: state_rx,
            frame: frame_rx,
            dispatcher,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Dispatcher used for this session's events.
    pub fn events(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Registers the handler for `kind`, replacing any previous one.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(SessionEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispatcher.register(kind, handler);
    }

    /// Connects to `address`.
    ///
    /// Already connected and `reconnect == false`: returns `Ok` without doing
    /// anything.  With `reconnect == true` the current connection is torn
    /// down (emitting `disconnected`) before the new attempt.  On success
    /// `ready` has been delivered by the time this returns.
    ///
    /// # Errors
    ///
    /// [`SessionError::TransportUnavailable`] if the endpoint cannot be
    /// reached within the connect timeout; [`SessionError::WorkerGone`] after
    /// shutdown.
    pub async fn connect(&self, address: RemoteAddress, reconnect: bool) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Connect {
            address,
            reconnect,
            reply,
        })?;
        rx.await.map_err(|_| SessionError::WorkerGone)?
    }

    /// Connects to the configured endpoint.
    pub async fn connect_default(&self) -> Result<(), SessionError> {
        self.connect(self.config.endpoint.clone(), false).await
    }

    /// Tears down the connection.  Idempotent.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Disconnect { reply })?;
        rx.await.map_err(|_| SessionError::WorkerGone)
    }

    /// Disconnects, delivers pending events and stops the worker thread.
    pub async fn shutdown(self) {
        let (reply, rx) = oneshot::channel();
        if self
            .send(SessionCommand::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn key_down(&self, symbol: Keysym) {
        self.fire(SessionCommand::Key {
            symbol,
            phase: KeyPhase::Down,
        });
    }

    pub fn key_up(&self, symbol: Keysym) {
        self.fire(SessionCommand::Key {
            symbol,
            phase: KeyPhase::Up,
        });
    }

    pub fn mouse_move(&self, x: u16, y: u16) {
        self.fire(SessionCommand::Pointer(PointerUpdate::Move { x, y }));
    }

    pub fn mouse_down(&self, button: MouseButton) {
        self.fire(SessionCommand::Pointer(PointerUpdate::Button {
            button,
            pressed: true,
        }));
    }

    pub fn mouse_up(&self, button: MouseButton) {
        self.fire(SessionCommand::Pointer(PointerUpdate::Button {
            button,
            pressed: false,
        }));
    }

    /// One wheel notch: press and release of the wheel button.
    pub fn mouse_scroll(&self, direction: ScrollDirection) {
        self.fire(SessionCommand::Pointer(PointerUpdate::Scroll(direction)));
    }

    /// Moves the pointer to `(x, y)` after checking it against the current
    /// screen.  Coordinates equal to the screen size are accepted.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotRunning`] without a live connection or before the
    /// first frame; [`SessionError::OutOfBounds`] when the point is off
    /// screen.
    pub async fn mouse_move_to(&self, x: i32, y: i32) -> Result<(), SessionError> {
        self.aim(PointerTarget::To {
            x: i64::from(x),
            y: i64::from(y),
        })
        .await
    }

    /// Moves the pointer by an offset from its tracked position.  Errors as
    /// for [`mouse_move_to`](Self::mouse_move_to).
    pub async fn mouse_move_by(&self, dx: i32, dy: i32) -> Result<(), SessionError> {
        self.aim(PointerTarget::By {
            dx: i64::from(dx),
            dy: i64::from(dy),
        })
        .await
    }

    /// Moves the pointer to the centre of the current screen.
    pub async fn mouse_move_center(&self) -> Result<(), SessionError> {
        self.aim(PointerTarget::Center).await
    }

    /// Parks the pointer in the far corner, then returns it to the origin.
    /// Resynchronises a guest cursor that drifted from the tracked position.
    pub async fn reset_cursor(&self) -> Result<(), SessionError> {
        self.aim(PointerTarget::FarCorner).await?;
        tokio::time::sleep(RESET_CURSOR_PAUSE).await;
        self.aim(PointerTarget::To { x: 0, y: 0 }).await
    }

    /// Most recent frame of the live connection, if one has arrived.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.frame.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Waits until the session reaches `target`.
    pub async fn wait_for_state(&self, target: SessionState) -> Result<(), SessionError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::WorkerGone)
    }

    /// Replayer that paces input onto this session with the configured
    /// delays.
    pub fn replayer(self: &Arc<Self>) -> KeyReplayer<Self> {
        KeyReplayer::new(self.clone(), self.config.type_delay(), self.config.click_delay())
    }

    async fn aim(&self, target: PointerTarget) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Aim { target, reply })?;
        rx.await.map_err(|_| SessionError::WorkerGone)?
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::WorkerGone)
    }

    fn fire(&self, command: SessionCommand) {
        if self.send(command).is_err() {
            debug!("session {}: worker gone, input dropped", self.id);
        }
    }
}

impl InputSink for RemoteDesktopSession {
    fn is_ready(&self) -> bool {
        RemoteDesktopSession::is_ready(self)
    }

    fn key_down(&self, symbol: Keysym) {
        RemoteDesktopSession::key_down(self, symbol);
    }

    fn key_up(&self, symbol: Keysym) {
        RemoteDesktopSession::key_up(self, symbol);
    }

    fn mouse_move(&self, x: u16, y: u16) {
        RemoteDesktopSession::mouse_move(self, x, y);
    }

    fn mouse_down(&self, button: MouseButton) {
        RemoteDesktopSession::mouse_down(self, button);
    }

    fn mouse_up(&self, button: MouseButton) {
        RemoteDesktopSession::mouse_up(self, button);
    }

    fn mouse_scroll(&self, direction: ScrollDirection) {
        RemoteDesktopSession::mouse_scroll(self, direction);
    }
}

impl Drop for RemoteDesktopSession {
    fn drop(&mut self) {
        let _ = self.commands.send(SessionCommand::Shutdown { reply: None });
    }
}
