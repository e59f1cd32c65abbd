//! # deskbridge-core
//!
//! Shared library for Deskbridge containing the keysym tables, the input chord
//! translator, and the frame/audio domain types used by the session bridge.
//!
//! It has zero dependencies on OS APIs, async runtimes, or network sockets.
//!
//! # Architecture overview
//!
//! Deskbridge lets a host application (typically a chat bot) drive a virtual
//! machine's screen, keyboard, and mouse over a remote-framebuffer connection.
//! This crate is the pure foundation:
//!
//! - **`keymap`** – Keysym values (the X11 numbering that remote-framebuffer
//!   endpoints understand) and the immutable name → keysym table used to
//!   resolve chord tokens such as `ctrl` or `pgdn`.
//!
//! - **`input`** – The chord parser and translator that turns a free-form text
//!   command (`` "`ctrl-alt-delete`" ``) into an exact, ordered list of
//!   [`KeyAction`]s, plus the pointer types (mouse buttons, scroll directions).
//!
//! - **`domain`** – The latest-frame snapshot type and the bounded audio
//!   accumulator.

pub mod domain;
pub mod input;
pub mod keymap;

// Re-export the most-used types at the crate root so callers can write
// `deskbridge_core::KeyAction` instead of `deskbridge_core::input::action::KeyAction`.
pub use domain::audio::{AudioAccumulator, AudioFormat};
pub use domain::frame::Frame;
pub use input::action::{KeyAction, KeyPhase};
pub use input::pointer::{ButtonMask, MouseButton, ParsePointerError, ScrollDirection};
pub use input::translate::ChordTranslator;
pub use keymap::{Keysym, KeysymTable};
