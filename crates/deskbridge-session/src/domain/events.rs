//! Events a session publishes to the host.
//!
//! The set of event kinds is closed: a host can subscribe to exactly the four
//! kinds below, one handler per kind.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use deskbridge_core::Frame;
use thiserror::Error;

/// Subscribable event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Disconnected,
    ScreenUpdate,
    AudioChunk,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Ready,
        EventKind::Disconnected,
        EventKind::ScreenUpdate,
        EventKind::AudioChunk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Disconnected => "disconnected",
            EventKind::ScreenUpdate => "screen_update",
            EventKind::AudioChunk => "audio_chunk",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EventKind::Ready => 0,
            EventKind::Disconnected => 1,
            EventKind::ScreenUpdate => 2,
            EventKind::AudioChunk => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event kind {0:?}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Why a live connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The host called `disconnect`.
    Requested,
    /// A `connect(.., reconnect = true)` replaced the connection.
    Reconnect,
    /// The endpoint closed the connection.
    TransportClosed,
    /// The endpoint sent something the protocol does not allow.
    ProtocolViolation(String),
    /// Any other transport failure.
    TransportFault(String),
    /// The session handle was shut down.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => f.write_str("requested by host"),
            DisconnectReason::Reconnect => f.write_str("replaced by reconnect"),
            DisconnectReason::TransportClosed => f.write_str("closed by endpoint"),
            DisconnectReason::ProtocolViolation(detail) => write!(f, "protocol violation: {detail}"),
            DisconnectReason::TransportFault(detail) => write!(f, "transport fault: {detail}"),
            DisconnectReason::Shutdown => f.write_str("session shut down"),
        }
    }
}

/// One event delivered to a host handler.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Ready,
    Disconnected { reason: DisconnectReason },
    ScreenUpdate(Arc<Frame>),
    AudioChunk(Arc<Vec<u8>>),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Ready => EventKind::Ready,
            SessionEvent::Disconnected { .. } => EventKind::Disconnected,
            SessionEvent::ScreenUpdate(_) => EventKind::ScreenUpdate,
            SessionEvent::AudioChunk(_) => EventKind::AudioChunk,
        }
    }
}
