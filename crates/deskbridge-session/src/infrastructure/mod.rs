//! Infrastructure layer for deskbridge-session.
//!
//! Everything that owns a thread, a runtime or a connection:
//!
//! - `transport`  the connector and the reader/writer halves the worker drives
//! - `scripted`   in-memory transport for tests and demos
//! - `worker`     command loop, refresh loop and audio pump
//! - `session`    the host-facing handle
//! - `controller` hypervisor-gated connect

pub mod controller;
pub mod scripted;
pub mod session;
pub mod transport;
mod worker;

pub use controller::SessionController;
pub use scripted::{RecordedInput, ScriptedConnector, ScriptedInput, ScriptedRemote, ScriptedUpdates};
pub use session::RemoteDesktopSession;
pub use transport::{FramebufferConnection, FramebufferConnector, InputWriter, TransportError, UpdateReader};
