//! Primitive key actions produced by the chord translator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keymap::Keysym;

/// Whether a key is being pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPhase {
    Down,
    Up,
}

/// One primitive keyboard action.  Sequences of these are replayed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyAction {
    pub symbol: Keysym,
    pub phase: KeyPhase,
}

impl KeyAction {
    pub fn down(symbol: Keysym) -> Self {
        Self {
            symbol,
            phase: KeyPhase::Down,
        }
    }

    pub fn up(symbol: Keysym) -> Self {
        Self {
            symbol,
            phase: KeyPhase::Up,
        }
    }

    pub fn is_down(&self) -> bool {
        self.phase == KeyPhase::Down
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.phase {
            KeyPhase::Down => "↓",
            KeyPhase::Up => "↑",
        };
        write!(f, "{}{}", self.symbol, arrow)
    }
}
