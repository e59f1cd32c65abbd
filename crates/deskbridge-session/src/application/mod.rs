//! Application layer for deskbridge-session.
//!
//! Runtime-agnostic orchestration: event dispatch to host handlers, paced
//! input replay, and the traits the session uses to reach its neighbours.
//! Sockets and the worker thread live in the infrastructure layer.

pub mod collaborators;
pub mod dispatcher;
pub mod replay;

pub use collaborators::{attach_display_sink, DisplaySink, HypervisorController};
pub use dispatcher::{DeliveryLoop, EventDispatcher, EventHandler};
pub use replay::{InputSink, KeyReplayer};

#[cfg(test)]
pub use collaborators::MockHypervisorController;
