//! Connection lifecycle states.

use std::fmt;

/// Where a session is in its connection lifecycle.
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──ok──▶ Ready
///      ▲                        │                │
///      └──────── failure ───────┘                │
///      └──────────────── Closing ◀── disconnect / closure
/// ```
///
/// Input primitives are only forwarded in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Ready,
    Closing,
}

impl SessionState {
    pub fn is_ready(self) -> bool {
        self == SessionState::Ready
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Closing => "closing",
        };
        f.write_str(s)
    }
}
