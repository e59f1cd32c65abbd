//! Domain layer for deskbridge-session.
//!
//! Plain types shared by the application and infrastructure layers: endpoint
//! addresses, configuration, lifecycle states, events and errors.  Nothing
//! here spawns tasks or touches a socket.

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod state;

pub use address::{AddressError, RemoteAddress};
pub use config::{AudioConfig, ConfigError, SessionConfig};
pub use error::SessionError;
pub use events::{DisconnectReason, EventKind, SessionEvent, UnknownEventKind};
pub use state::SessionState;

/// Identifies one session in logs.
pub type SessionId = uuid::Uuid;
