//! In-memory remote-framebuffer endpoint for tests and demos.
//!
//! [`ScriptedConnector`] hands out connections that never touch a socket.
//! The test drives the "remote side" through a [`ScriptedRemote`] handle:
//! push frames or PCM, inject a protocol violation or an I/O fault, or close
//! the connection.  Every key and pointer event the session sends is recorded.
//!
//! ```ignore
//! let connector = ScriptedConnector::new();
//! let session = RemoteDesktopSession::spawn(config, Arc::new(connector.clone()))?;
//! session.connect(address, false).await?;
//!
//! let remote = connector.remote().unwrap();
//! remote.push_frame(Frame::new(640, 480, pixels));
//! remote.close();
//! ```
//!
//! The connector also counts open transports, so tests can assert that a
//! session never holds two connections at once.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use deskbridge_core::{ButtonMask, Frame, Keysym};
use tokio::sync::mpsc;

use super::transport::{FramebufferConnection, FramebufferConnector, InputWriter, TransportError, UpdateReader};
use crate::domain::RemoteAddress;

/// How long one `request_update` waits for a pushed frame before reporting
/// "no change".
const UPDATE_POLL: Duration = Duration::from_millis(5);

const AUDIO_QUEUE: usize = 64;

/// One input event received by a scripted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedInput {
    Key { symbol: Keysym, down: bool },
    Pointer { x: u16, y: u16, buttons: ButtonMask },
}

enum ScriptedUpdate {
    Frame(Frame),
    Violation(String),
    Fault(std::io::ErrorKind),
}

#[derive(Default)]
struct Shared {
    unreachable: AtomicBool,
    connect_delay_ms: AtomicU64,
    connects: AtomicUsize,
    open: AtomicUsize,
    max_open: AtomicUsize,
    update_requests: AtomicUsize,
    remote: Mutex<Option<ScriptedRemote>>,
    inputs: Mutex<Vec<RecordedInput>>,
}

/// Connector whose connections are driven by the test.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every connect attempt fails with `Unreachable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.shared.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delays every connect attempt, to exercise the connect timeout.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.shared
            .connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Connections established and not yet closed or dropped.
    pub fn open_transports(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Highest value `open_transports` has reached.
    pub fn max_open_transports(&self) -> usize {
        self.shared.max_open.load(Ordering::SeqCst)
    }

    /// Update requests received, across all connections.
    pub fn update_requests(&self) -> usize {
        self.shared.update_requests.load(Ordering::SeqCst)
    }

    /// Remote side of the most recent connection.
    pub fn remote(&self) -> Option<ScriptedRemote> {
        self.shared.remote.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every key and pointer event received, across all connections.
    pub fn inputs(&self) -> Vec<RecordedInput> {
        self.shared.inputs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl FramebufferConnector for ScriptedConnector {
    async fn connect(&self, address: &RemoteAddress) -> Result<FramebufferConnection, TransportError> {
        let delay = self.shared.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.shared.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable(format!("nothing listening at {address}")));
        }

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_QUEUE);
        let closed = Arc::new(AtomicBool::new(false));
        *self.shared.remote.lock().unwrap_or_else(PoisonError::into_inner) = Some(ScriptedRemote {
            updates: updates_tx,
            audio: audio_tx,
            closed: closed.clone(),
        });

        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        let open = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_open.fetch_max(open, Ordering::SeqCst);
        let guard = Arc::new(OpenGuard {
            shared: self.shared.clone(),
            released: AtomicBool::new(false),
        });

        Ok(FramebufferConnection {
            updates: Box::new(ScriptedUpdates {
                updates: updates_rx,
                closed: closed.clone(),
                shared: self.shared.clone(),
                _guard: guard.clone(),
            }),
            input: Box::new(ScriptedInput {
                closed,
                shared: self.shared.clone(),
                guard,
            }),
            audio: Some(audio_rx),
        })
    }
}

/// Test-side handle to a scripted connection.
#[derive(Clone)]
pub struct ScriptedRemote {
    updates: mpsc::UnboundedSender<ScriptedUpdate>,
    audio: mpsc::Sender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedRemote {
    /// Queues a frame; the next update request returns it.
    pub fn push_frame(&self, frame: Frame) {
        let _ = self.updates.send(ScriptedUpdate::Frame(frame));
    }

    /// Makes the next update request fail with a protocol violation.
    pub fn violate_protocol(&self, detail: &str) {
        let _ = self.updates.send(ScriptedUpdate::Violation(detail.to_string()));
    }

    /// Makes the next update request fail with an I/O error of `kind`.
    pub fn fail_io(&self, kind: std::io::ErrorKind) {
        let _ = self.updates.send(ScriptedUpdate::Fault(kind));
    }

    /// Delivers PCM bytes to the session's audio stream.  Returns false if
    /// the stream is gone or full.
    pub fn push_audio(&self, pcm: Vec<u8>) -> bool {
        self.audio.try_send(pcm).is_ok()
    }

    /// Closes the connection from the remote side, without any error being
    /// reported to the session.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Releases one open-connection count on close, or once both halves drop.
struct OpenGuard {
    shared: Arc<Shared>,
    released: AtomicBool,
}

impl OpenGuard {
    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Update half of a scripted connection.
pub struct ScriptedUpdates {
    updates: mpsc::UnboundedReceiver<ScriptedUpdate>,
    closed: Arc<AtomicBool>,
    shared: Arc<Shared>,
    _guard: Arc<OpenGuard>,
}

#[async_trait]
impl UpdateReader for ScriptedUpdates {
    async fn request_update(&mut self, _incremental: bool) -> Result<Option<Frame>, TransportError> {
        self.shared.update_requests.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match tokio::time::timeout(UPDATE_POLL, self.updates.recv()).await {
            Ok(Some(ScriptedUpdate::Frame(frame))) => Ok(Some(frame)),
            Ok(Some(ScriptedUpdate::Violation(detail))) => Err(TransportError::Protocol(detail)),
            Ok(Some(ScriptedUpdate::Fault(kind))) => {
                Err(std::io::Error::new(kind, "scripted transport fault").into())
            }
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Ok(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Input half of a scripted connection.
pub struct ScriptedInput {
    closed: Arc<AtomicBool>,
    shared: Arc<Shared>,
    guard: Arc<OpenGuard>,
}

impl ScriptedInput {
    fn record(&self, input: RecordedInput) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.shared.inputs.lock().unwrap_or_else(PoisonError::into_inner).push(input);
        Ok(())
    }
}

#[async_trait]
impl InputWriter for ScriptedInput {
    async fn key_event(&mut self, symbol: Keysym, down: bool) -> Result<(), TransportError> {
        self.record(RecordedInput::Key { symbol, down })
    }

    async fn pointer_event(&mut self, x: u16, y: u16, buttons: ButtonMask) -> Result<(), TransportError> {
        self.record(RecordedInput::Pointer { x, y, buttons })
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> RemoteAddress {
        "unix:/tmp/scripted.sock".parse().unwrap()
    }

    #[tokio::test]
    async fn test_connect_tracks_open_transports() {
        // Arrange
        let connector = ScriptedConnector::new();

        // Act
        let mut first = connector.connect(&address()).await.unwrap();
        let second = connector.connect(&address()).await.unwrap();
        first.input.close().await;
        let open_after_close = connector.open_transports();
        drop(second);

        // Assert
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(connector.max_open_transports(), 2);
        assert_eq!(open_after_close, 1);
        assert_eq!(connector.open_transports(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_connector_refuses() {
        let connector = ScriptedConnector::new();
        connector.set_unreachable(true);

        let result = connector.connect(&address()).await;

        assert!(matches!(result, Err(TransportError::Unreachable(_))));
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_update_returns_pushed_frame_then_no_change() {
        // Arrange
        let connector = ScriptedConnector::new();
        let mut connection = connector.connect(&address()).await.unwrap();
        connector.remote().unwrap().push_frame(Frame::new(2, 2, vec![0; 16]));

        // Act
        let first = connection.updates.request_update(true).await.unwrap();
        let second = connection.updates.request_update(true).await.unwrap();

        // Assert
        assert_eq!(first.map(|f| f.width), Some(2));
        assert!(second.is_none());
        assert_eq!(connector.update_requests(), 2);
    }

    #[tokio::test]
    async fn test_injected_fault_is_an_io_error() {
        let connector = ScriptedConnector::new();
        let mut connection = connector.connect(&address()).await.unwrap();

        connector.remote().unwrap().fail_io(std::io::ErrorKind::ConnectionReset);

        match connection.updates.request_update(true).await {
            Err(TransportError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("expected I/O error, got {:?}", other.map(|f| f.is_some())),
        }
    }

    #[tokio::test]
    async fn test_remote_close_is_visible_without_error() {
        let connector = ScriptedConnector::new();
        let mut connection = connector.connect(&address()).await.unwrap();

        connector.remote().unwrap().close();

        assert!(connection.updates.is_closed());
        assert!(matches!(
            connection.input.key_event(Keysym::RETURN, true).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_inputs_are_recorded_in_order() {
        let connector = ScriptedConnector::new();
        let mut connection = connector.connect(&address()).await.unwrap();

        connection.input.key_event(Keysym::TAB, true).await.unwrap();
        connection.input.pointer_event(5, 6, ButtonMask(1)).await.unwrap();

        assert_eq!(
            connector.inputs(),
            vec![
                RecordedInput::Key {
                    symbol: Keysym::TAB,
                    down: true
                },
                RecordedInput::Pointer {
                    x: 5,
                    y: 6,
                    buttons: ButtonMask(1)
                },
            ]
        );
    }
}
