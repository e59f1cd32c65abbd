//! Keyboard and pointer input: key actions, the chord parser/translator, and
//! mouse button types.

pub mod action;
pub mod chord;
pub mod pointer;
pub mod translate;

pub use action::{KeyAction, KeyPhase};
pub use pointer::{ButtonMask, MouseButton, ScrollDirection};
pub use translate::ChordTranslator;
