//! The remote-framebuffer transport seam.
//!
//! The session worker never speaks a wire protocol itself.  It asks a
//! [`FramebufferConnector`] for a [`FramebufferConnection`] and drives its
//! halves independently:
//!
//! - the [`UpdateReader`] belongs to the refresh loop, which awaits
//!   incremental update requests;
//! - the [`InputWriter`] belongs to the command loop, which sends key and
//!   pointer events;
//! - the optional PCM receiver feeds the audio pump.
//!
//! An incremental update request may stay unanswered for as long as the
//! screen is idle, so the halves must not share a lock: a pending request
//! never delays input or a disconnect.
//!
//! `request_update` must be cancel-safe: the refresh loop is aborted
//! mid-await when the session disconnects.

use async_trait::async_trait;
use deskbridge_core::{ButtonMask, Frame, Keysym};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::RemoteAddress;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing is listening, or the handshake was refused.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint closed the connection.
    #[error("connection closed by endpoint")]
    Closed,

    /// The endpoint sent data the protocol does not allow.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens connections to a remote-framebuffer endpoint.
#[async_trait]
pub trait FramebufferConnector: Send + Sync {
    /// Connects and completes the protocol handshake.
    async fn connect(&self, address: &RemoteAddress) -> Result<FramebufferConnection, TransportError>;
}

/// One live connection, split into halves that are driven concurrently.
pub struct FramebufferConnection {
    pub updates: Box<dyn UpdateReader>,
    pub input: Box<dyn InputWriter>,
    /// PCM stream, if the endpoint provides audio.
    pub audio: Option<mpsc::Receiver<Vec<u8>>>,
}

/// Receiving half: framebuffer updates.
#[async_trait]
pub trait UpdateReader: Send {
    /// Requests a framebuffer update.  `Ok(None)` means nothing changed.
    async fn request_update(&mut self, incremental: bool) -> Result<Option<Frame>, TransportError>;

    /// True once the endpoint has gone away, even if no call has failed yet.
    fn is_closed(&self) -> bool;
}

/// Sending half: input events and the close handshake.
#[async_trait]
pub trait InputWriter: Send {
    async fn key_event(&mut self, symbol: Keysym, down: bool) -> Result<(), TransportError>;

    async fn pointer_event(&mut self, x: u16, y: u16, buttons: ButtonMask) -> Result<(), TransportError>;

    /// Closes the connection.  Must be safe to call on an already-closed
    /// connection.
    async fn close(&mut self);
}
