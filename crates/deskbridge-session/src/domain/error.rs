//! Errors surfaced to the host by session operations.

use thiserror::Error;

use super::address::RemoteAddress;

/// Failures surfaced to the host by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The endpoint could not be reached, refused the handshake, or did not
    /// answer within the connect timeout.
    #[error("remote desktop at {address} is unavailable: {reason}")]
    TransportUnavailable {
        address: RemoteAddress,
        reason: String,
    },

    /// An operation that needs a live connection (or a running VM) was
    /// invoked while there is none.
    #[error("VM is not running")]
    NotRunning,

    /// A pointer destination lies outside the current screen.
    #[error("coordinates ({x}, {y}) are out of bounds for a {width}x{height} screen")]
    OutOfBounds { x: i64, y: i64, width: u16, height: u16 },

    /// The session worker thread has exited; the handle is unusable.
    #[error("session worker has stopped")]
    WorkerGone,

    /// The worker thread or its runtime could not be started.
    #[error("failed to start session worker: {0}")]
    Spawn(#[from] std::io::Error),
}
