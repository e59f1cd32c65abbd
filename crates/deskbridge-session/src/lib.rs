//! deskbridge-session library crate.
//!
//! Bridges a host application to a remote graphical desktop over a
//! remote-framebuffer connection.  The connection runs on an isolated worker
//! thread; the host sees a non-blocking command surface and a stream of
//! events.
//!
//! # Architecture
//!
//! ```text
//! Host application
//!     │  connect / disconnect / key_down / mouse_move ...   (mpsc commands)
//!     ▼
//! [deskbridge-session]
//!   ├── domain/          Config, addresses, states, events, errors
//!   ├── application/     Event dispatch, paced replay, collaborator traits
//!   └── infrastructure/
//!         ├── worker     Command loop + refresh loop + audio pump
//!         ├── session    Host-facing handle (RemoteDesktopSession)
//!         └── transport  Connector / transport seam
//!     │
//!     ▼  ready / disconnected / screen_update / audio_chunk  (handlers)
//! Host application
//! ```
//!
//! # Layer rules
//!
//! - `domain` performs no I/O and spawns nothing.
//! - `application` depends on `domain` and `deskbridge-core`; it uses tokio
//!   channels and timers but never opens a connection.
//! - `infrastructure` owns the worker thread, its runtime and the transport.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{attach_display_sink, DisplaySink, EventDispatcher, HypervisorController, InputSink, KeyReplayer};
pub use domain::{
    DisconnectReason, EventKind, RemoteAddress, SessionConfig, SessionError, SessionEvent, SessionId, SessionState,
};
pub use infrastructure::{
    FramebufferConnection, FramebufferConnector, InputWriter, RemoteDesktopSession, SessionController, TransportError,
    UpdateReader,
};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that honours `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"` or `"deskbridge_session=debug"`).
///
/// Does nothing if a global subscriber is already set, so tests may call it
/// freely.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
